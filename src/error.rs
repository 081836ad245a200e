use std::fmt;
use std::io;

use crate::layout::{
	Field,
	MAX_CHANNELS,
};

/// A bus transfer that didn't move the expected number of bytes.
#[derive(Debug, Fail)]
pub enum TransportError {
	#[fail(display = "I2C transfer at address 0x{:04X} failed: {}", address, error)]
	Bus {
		address: u16,
		#[cause]
		error: io::Error,
	},
	#[fail(display = "Failed to write at address 0x{:04X}: {} of {} bytes acknowledged", address, actual, expected)]
	ShortWrite {
		address: u16,
		expected: usize,
		actual: usize,
	},
	#[fail(display = "Failed to read at address 0x{:04X}: got {} of {} bytes", address, actual, expected)]
	ShortRead {
		address: u16,
		expected: usize,
		actual: usize,
	},
	#[fail(display = "Block of {} bytes at 0x{:04X} exceeds the 16-bit address space", len, start)]
	AddressOverflow {
		start: u16,
		len: usize,
	},
}

impl TransportError {
	/// EEPROM address of the failed transfer.
	pub fn address(&self) -> u16 {
		match *self {
			TransportError::Bus { address, .. } => address,
			TransportError::ShortWrite { address, .. } => address,
			TransportError::ShortRead { address, .. } => address,
			TransportError::AddressOverflow { start, .. } => start,
		}
	}
}

/// Layout data that can't be represented on the device.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Fail)]
pub enum ConfigurationError {
	TooManyChannels {
		map: usize,
		num_chan: usize,
	},
	/// `end` is `None` when the slot is past the 16-bit address space.
	MapOutOfRange {
		map: usize,
		end: Option<usize>,
		capacity: usize,
	},
	TooManyMaps {
		count: usize,
	},
}

impl fmt::Display for ConfigurationError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ConfigurationError::TooManyChannels { map, num_chan } => write!(f,
				"Map {}: {} channels were requested, but the maximum number is {}",
				map, num_chan, MAX_CHANNELS,
			),
			ConfigurationError::MapOutOfRange { map, end: Some(end), capacity } => write!(f,
				"Map {} ends at 0x{:04X}, past the EEPROM capacity of 0x{:04X} bytes",
				map, end, capacity,
			),
			ConfigurationError::MapOutOfRange { map, end: None, .. } => write!(f,
				"Map {} is outside of the 16-bit address space", map,
			),
			ConfigurationError::TooManyMaps { count } => write!(f,
				"{} maps defined, but the header can only count 255", count,
			),
		}
	}
}

impl ConfigurationError {
	pub fn map(&self) -> Option<usize> {
		match *self {
			ConfigurationError::TooManyChannels { map, .. } => Some(map),
			ConfigurationError::MapOutOfRange { map, .. } => Some(map),
			ConfigurationError::TooManyMaps { .. } => None,
		}
	}
}

/// Readback differs from what was written.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Fail)]
pub struct Mismatch {
	pub field: Field,
	/// Index into the channel table for `Field::ChannelTable`.
	pub position: Option<usize>,
	pub expected: String,
	pub actual: String,
}

impl fmt::Display for Mismatch {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.position {
			Some(position) => write!(f,
				"{} verification failed: expected {} at table position {}, got {}",
				self.field, self.expected, position, self.actual,
			),
			None => write!(f,
				"{} verification failed: expected {}, got {}",
				self.field, self.expected, self.actual,
			),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Phase {
	Write,
	Read,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Phase::Write => write!(f, "write"),
			Phase::Read => write!(f, "read back"),
		}
	}
}

#[derive(Debug, Fail)]
pub enum Error {
	#[fail(display = "Failed to {} {}: {}", phase, field, error)]
	Transport {
		phase: Phase,
		field: Field,
		#[cause]
		error: TransportError,
	},
	#[fail(display = "{}", _0)]
	Configuration(#[cause] ConfigurationError),
	#[fail(display = "{}", _0)]
	Verification(#[cause] Mismatch),
	#[fail(display = "Failed to clear EEPROM write protection: {}", _0)]
	WriteProtect(#[cause] io::Error),
}

impl Error {
	pub(crate) fn transport(phase: Phase, field: Field) -> impl FnOnce(TransportError) -> Error {
		move |error| Error::Transport { phase, field, error }
	}
}

impl From<ConfigurationError> for Error {
	fn from(e: ConfigurationError) -> Self {
		Error::Configuration(e)
	}
}

impl From<Mismatch> for Error {
	fn from(e: Mismatch) -> Self {
		Error::Verification(e)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_name_the_failing_step() {
		let e = Error::Transport {
			phase: Phase::Write,
			field: Field::MapName { map: 1 },
			error: TransportError::ShortWrite { address: 0x0805, expected: 3, actual: 2 },
		};
		assert_eq!(
			e.to_string(),
			"Failed to write map 1 name: Failed to write at address 0x0805: 2 of 3 bytes acknowledged",
		);

		let e = ConfigurationError::TooManyChannels { map: 1, num_chan: 200 };
		assert_eq!(e.map(), Some(1));
		assert_eq!(ConfigurationError::TooManyMaps { count: 300 }.map(), None);
		let e = Error::from(e);
		assert_eq!(e.to_string(), "Map 1: 200 channels were requested, but the maximum number is 128");

		let e = Error::from(Mismatch {
			field: Field::ChannelTable { map: 0 },
			position: Some(5),
			expected: "37".into(),
			actual: "255".into(),
		});
		assert_eq!(e.to_string(), "channel map 0 verification failed: expected 37 at table position 5, got 255");
	}
}
