//! Decode whatever layout is currently stored on a device.

use std::fmt;

use super::Eeprom;
use crate::i2c::I2c;
use crate::layout::{
	FixedStr,
	LAYOUT_VERSION_OFFSET,
	Layout,
	LayoutVersion,
	MAGIC_LEN,
	MAGIC_OFFSET,
	MAX_CHANNELS,
	MODULE_NAME_OFFSET,
	Magic,
	MapSlot,
	NAME_LEN,
	NUM_MAPS_OFFSET,
	Name,
	PCB_REV_OFFSET,
	escape_bytes,
	map_base,
};

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ChannelMapImage {
	pub name: Name,
	pub channels: Vec<u8>,
}

/// Owned copy of the layout read from a device.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct LayoutImage {
	pub magic: Magic,
	pub version: LayoutVersion,
	pub module_name: Name,
	pub pcb_rev: u8,
	pub maps: Vec<ChannelMapImage>,
}

impl LayoutImage {
	/// Same content as `layout`; names compared up to their terminator.
	pub fn matches(&self, layout: &Layout) -> bool {
		self.magic == layout.magic
			&& self.version == layout.version
			&& self.module_name.eq_c_str(layout.module_name.as_padded())
			&& self.pcb_rev == layout.pcb_rev
			&& self.maps.len() == layout.maps.len()
			&& self.maps.iter().zip(layout.maps.iter()).all(|(image, map)| {
				image.name.eq_c_str(map.name.as_padded()) && &image.channels[..] == map.channels
			})
	}
}

impl fmt::Display for LayoutImage {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "magic '")?;
		escape_bytes(f, self.magic.as_padded())?;
		write!(f, "', layout {}, module '{}', PCB rev '", self.version, self.module_name)?;
		escape_bytes(f, &[self.pcb_rev])?;
		write!(f, "', {} maps", self.maps.len())
	}
}

fn read_fixed<B: I2c, const N: usize>(eeprom: &mut Eeprom<B>, address: u16) -> crate::AResult<FixedStr<N>> {
	let mut raw = [0u8; N];
	eeprom.read_block(address, &mut raw)?;
	Ok(FixedStr::from_raw(raw))
}

fn read_map<B: I2c>(eeprom: &mut Eeprom<B>, index: usize) -> crate::AResult<ChannelMapImage> {
	let capacity = eeprom.config().capacity;
	let base = map_base(index).ok_or_else(|| format_err!("Map {} is outside of the address space", index))?;
	let slot = MapSlot { index, base, num_chan: 0 };
	ensure!(slot.table_address() as usize <= capacity,
		"Map {} at 0x{:04X} is past the end of the EEPROM", index, base
	);

	let num_chan = eeprom.read_byte(slot.num_chan_address())?;
	ensure!(num_chan as usize <= MAX_CHANNELS,
		"Invalid channel count in map {}: {} (maximum is {})", index, num_chan, MAX_CHANNELS
	);
	ensure!(slot.table_address() as usize + num_chan as usize <= capacity,
		"Channel table of map {} is past the end of the EEPROM", index
	);
	let slot = MapSlot { num_chan, ..slot };

	let name = read_fixed::<B, NAME_LEN>(eeprom, slot.name_address())?;
	let channels = eeprom.read_vec(slot.table_address(), slot.num_chan as usize)?;

	Ok(ChannelMapImage { name, channels })
}

/// Read header and all maps it announces. Fails if the magic isn't
/// `expected_magic` or a map is malformed.
pub fn read_image<B: I2c>(eeprom: &mut Eeprom<B>, expected_magic: &Magic) -> crate::AResult<LayoutImage> {
	let magic = read_fixed::<B, MAGIC_LEN>(eeprom, MAGIC_OFFSET)?;
	ensure!(magic.eq_full_width(expected_magic.as_padded()),
		"Invalid magic: '{}' (expected '{}')", magic, expected_magic
	);

	let mut version = [0u8; 2];
	eeprom.read_block(LAYOUT_VERSION_OFFSET, &mut version)?;
	let version = LayoutVersion::from_bytes(version);

	let module_name = read_fixed::<B, NAME_LEN>(eeprom, MODULE_NAME_OFFSET)?;
	let pcb_rev = eeprom.read_byte(PCB_REV_OFFSET)?;
	let num_maps = eeprom.read_byte(NUM_MAPS_OFFSET)?;

	let mut maps = Vec::with_capacity(num_maps as usize);
	for index in 0..num_maps as usize {
		maps.push(with_context!(("couldn't read map {}", index), read_map(eeprom, index))?);
	}

	Ok(LayoutImage {
		magic,
		version,
		module_name,
		pcb_rev,
		maps,
	})
}
