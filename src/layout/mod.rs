//! Byte layout of the headstage EEPROM.
//!
//! Header at the start of the device, followed by one 1 KiB slot per
//! channel map:
//!
//! ```text
//! 0x0000-0x0009  magic (10 bytes ASCII, no terminator)
//! 0x000A-0x000B  layout version (major, minor)
//! 0x000C-0x002B  module name (32 bytes, NUL padded)
//! 0x002C         PCB revision (1 byte ASCII)
//! 0x002D         number of maps
//! 0x0400+i*0x0400+0x0000          map[i] channel count
//! 0x0400+i*0x0400+0x0001..0x0020  map[i] name (32 bytes, NUL padded)
//! 0x0400+i*0x0400+0x0021..        map[i] channel table (one byte per channel)
//! ```

use std::fmt;

use crate::error::ConfigurationError;

mod fixed_str;
pub mod image;

pub use self::fixed_str::FixedStr;
pub(crate) use self::fixed_str::escape_bytes;

pub const MAGIC_LEN: usize = 10;
pub const NAME_LEN: usize = 32;

pub const MAGIC_OFFSET: u16 = 0x0000;
pub const LAYOUT_VERSION_OFFSET: u16 = 0x000A;
pub const MODULE_NAME_OFFSET: u16 = 0x000C;
pub const PCB_REV_OFFSET: u16 = 0x002C;
pub const NUM_MAPS_OFFSET: u16 = 0x002D;

pub const MAP_BASE_OFFSET: u16 = 0x0400;
pub const MAP_SLOT_SIZE: u16 = 0x0400;

// relative to the map slot
pub const MAP_NUM_CHAN_OFFSET: u16 = 0x0000;
pub const MAP_NAME_OFFSET: u16 = 0x0001;
pub const MAP_TABLE_OFFSET: u16 = 0x0021;

/// Hard ceiling for the channel count of a single map.
pub const MAX_CHANNELS: usize = 128;
pub const MAP_TABLE_CAPACITY: usize = (MAP_SLOT_SIZE - MAP_TABLE_OFFSET) as usize;

pub type Magic = FixedStr<MAGIC_LEN>;
pub type Name = FixedStr<NAME_LEN>;

/// Base address of map slot `index`; `None` if the slot doesn't fit into
/// the 16-bit address space.
pub fn map_base(index: usize) -> Option<u16> {
	let base = (MAP_BASE_OFFSET as usize).checked_add(index.checked_mul(MAP_SLOT_SIZE as usize)?)?;
	if base + MAP_SLOT_SIZE as usize > 0x1_0000 {
		return None;
	}
	Some(base as u16)
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LayoutVersion {
	pub major: u8,
	pub minor: u8,
}

impl LayoutVersion {
	pub const fn to_bytes(self) -> [u8; 2] {
		[self.major, self.minor]
	}

	pub const fn from_bytes(raw: [u8; 2]) -> Self {
		LayoutVersion { major: raw[0], minor: raw[1] }
	}
}

impl fmt::Display for LayoutVersion {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}.{}", self.major, self.minor)
	}
}

/// Channel map for one connector / headstage variant. The channel count
/// stored on the device is the length of `channels`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ChannelMap<'a> {
	pub name: Name,
	pub channels: &'a [u8],
}

impl<'a> ChannelMap<'a> {
	pub const fn new(name: &str, channels: &'a [u8]) -> Self {
		ChannelMap {
			name: FixedStr::from_str(name),
			channels,
		}
	}

	pub fn num_chan(&self) -> usize {
		self.channels.len()
	}

	/// Place this map into slot `index` of a device with `capacity` bytes.
	pub fn slot(&self, index: usize, capacity: usize) -> Result<MapSlot, ConfigurationError> {
		let num_chan = self.num_chan();
		if num_chan > MAX_CHANNELS {
			return Err(ConfigurationError::TooManyChannels { map: index, num_chan });
		}
		debug_assert!(num_chan <= MAP_TABLE_CAPACITY);

		let base = match map_base(index) {
			Some(base) => base,
			None => return Err(ConfigurationError::MapOutOfRange { map: index, end: None, capacity }),
		};
		let end = base as usize + MAP_TABLE_OFFSET as usize + num_chan;
		if end > capacity {
			return Err(ConfigurationError::MapOutOfRange { map: index, end: Some(end), capacity });
		}

		Ok(MapSlot {
			index,
			base,
			num_chan: num_chan as u8,
		})
	}
}

/// Validated position of a channel map on the device.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MapSlot {
	pub index: usize,
	pub base: u16,
	pub num_chan: u8,
}

impl MapSlot {
	pub fn num_chan_address(&self) -> u16 {
		self.base + MAP_NUM_CHAN_OFFSET
	}

	pub fn name_address(&self) -> u16 {
		self.base + MAP_NAME_OFFSET
	}

	pub fn table_address(&self) -> u16 {
		self.base + MAP_TABLE_OFFSET
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Layout<'a> {
	pub magic: Magic,
	pub version: LayoutVersion,
	pub module_name: Name,
	pub pcb_rev: u8,
	pub maps: &'a [ChannelMap<'a>],
}

impl<'a> Layout<'a> {
	pub fn num_maps(&self) -> Result<u8, ConfigurationError> {
		let count = self.maps.len();
		if count > u8::max_value() as usize {
			return Err(ConfigurationError::TooManyMaps { count });
		}
		Ok(count as u8)
	}
}

/// A location in the layout, for progress and error reporting.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Field {
	Magic,
	LayoutVersion,
	ModuleName,
	PcbRevision,
	NumMaps,
	ChannelCount { map: usize },
	MapName { map: usize },
	ChannelTable { map: usize },
}

impl Field {
	/// Map index for per-map fields.
	pub fn map(&self) -> Option<usize> {
		match *self {
			Field::ChannelCount { map } | Field::MapName { map } | Field::ChannelTable { map } => Some(map),
			_ => None,
		}
	}
}

impl fmt::Display for Field {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Field::Magic => write!(f, "magic string"),
			Field::LayoutVersion => write!(f, "layout version"),
			Field::ModuleName => write!(f, "module name"),
			Field::PcbRevision => write!(f, "PCB revision"),
			Field::NumMaps => write!(f, "number of maps"),
			Field::ChannelCount { map } => write!(f, "map {} channel count", map),
			Field::MapName { map } => write!(f, "map {} name", map),
			Field::ChannelTable { map } => write!(f, "channel map {}", map),
		}
	}
}
