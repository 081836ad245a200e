//! Protocol for 16-bit addressed I2C serial EEPROMs like the AT24C64D.
//!
//! Every write transaction starts with the memory address (high byte
//! first), followed by data. We only ever write a single data byte per
//! transaction and wait for the full write cycle afterwards, so page size and
//! page boundaries don't matter.
//!
//! A read is one combined transaction: write the memory address, repeated
//! START, then read any number of bytes; the device auto-increments.

use std::time::Duration;

use crate::error::TransportError;
use crate::i2c::I2c;

mod program;
pub mod readback;
mod verify;

pub use self::program::{
	program_header,
	program_layout,
	program_map,
};

pub use self::readback::{
	ChannelMapImage,
	LayoutImage,
	read_image,
};

pub use self::verify::{
	verify_header,
	verify_layout,
	verify_map,
};

/// Maximum write cycle time (tWR) of the AT24C64D.
pub const MIN_WRITE_CYCLE: Duration = Duration::from_millis(5);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EepromConfig {
	/// 7-bit I2C address.
	pub device_address: u8,
	/// Size in bytes.
	pub capacity: usize,
	/// Maximum write cycle time; every byte write waits this long.
	pub write_cycle: Duration,
}

impl Default for EepromConfig {
	// AT24C64D with A0..A2 tied low
	fn default() -> Self {
		EepromConfig {
			device_address: 0x50,
			capacity: 0x2000,
			write_cycle: MIN_WRITE_CYCLE,
		}
	}
}

impl EepromConfig {
	/// Wait `write_cycle` after every byte write; anything below the
	/// part's tWR is refused.
	pub fn with_write_cycle(self, write_cycle: Duration) -> crate::AResult<Self> {
		ensure!(write_cycle >= MIN_WRITE_CYCLE,
			"Write cycle of {:?} is shorter than the {:?} the EEPROM needs", write_cycle, MIN_WRITE_CYCLE
		);
		Ok(EepromConfig { write_cycle, ..self })
	}
}

fn address_bytes(address: u16) -> [u8; 2] {
	[(address >> 8) as u8, address as u8]
}

pub struct Eeprom<B: I2c> {
	bus: B,
	config: EepromConfig,
}

impl<B: I2c> Eeprom<B> {
	pub fn new(bus: B, config: EepromConfig) -> Self {
		Eeprom { bus, config }
	}

	pub fn config(&self) -> &EepromConfig {
		&self.config
	}

	pub fn bus(&self) -> &B {
		&self.bus
	}

	pub fn bus_mut(&mut self) -> &mut B {
		&mut self.bus
	}

	pub fn into_inner(self) -> B {
		self.bus
	}

	/// Write a single byte and wait for the device to commit it. No retry.
	pub fn write_byte(&mut self, address: u16, data: u8) -> Result<(), TransportError> {
		let [hi, lo] = address_bytes(address);
		let buffer = [hi, lo, data];

		let written = self.bus.write(self.config.device_address, &buffer)
			.map_err(|error| TransportError::Bus { address, error })?;
		if written != buffer.len() {
			return Err(TransportError::ShortWrite {
				address,
				expected: buffer.len(),
				actual: written,
			});
		}

		self.bus.delay(self.config.write_cycle);
		Ok(())
	}

	/// Write `data` byte by byte to consecutive addresses starting at `start`.
	///
	/// Stops at the first failing byte; bytes before it stay written.
	pub fn write_block(&mut self, start: u16, data: &[u8]) -> Result<(), TransportError> {
		if start as usize + data.len() > 0x1_0000 {
			return Err(TransportError::AddressOverflow { start, len: data.len() });
		}

		debug!("Writing {} bytes starting at address 0x{:04X}...", data.len(), start);
		for (i, &b) in data.iter().enumerate() {
			let address = start + i as u16;
			if let Err(e) = self.write_byte(address, b) {
				debug!("Failed to write at address 0x{:04X}", address);
				return Err(e);
			}
		}
		debug!("  Wrote {} bytes at address 0x{:04X}", data.len(), start);

		Ok(())
	}

	/// Fill `target` from consecutive addresses starting at `address`.
	pub fn read_block(&mut self, address: u16, target: &mut [u8]) -> Result<(), TransportError> {
		if target.is_empty() {
			return Ok(());
		}
		let addr_buf = address_bytes(address);

		let transferred = self.bus.write_read(self.config.device_address, &addr_buf, target)
			.map_err(|error| TransportError::Bus { address, error })?;
		if transferred.written != addr_buf.len() {
			return Err(TransportError::ShortWrite {
				address,
				expected: addr_buf.len(),
				actual: transferred.written,
			});
		}
		if transferred.read != target.len() {
			return Err(TransportError::ShortRead {
				address,
				expected: target.len(),
				actual: transferred.read,
			});
		}

		Ok(())
	}

	pub fn read_vec(&mut self, address: u16, len: usize) -> Result<Vec<u8>, TransportError> {
		let mut buf = vec![0u8; len];
		self.read_block(address, &mut buf)?;
		Ok(buf)
	}

	pub fn read_byte(&mut self, address: u16) -> Result<u8, TransportError> {
		let mut buf = [0u8];
		self.read_block(address, &mut buf)?;
		Ok(buf[0])
	}
}
