use super::Eeprom;
use crate::error::{
	Error,
	Phase,
};
use crate::i2c::I2c;
use crate::layout::{
	ChannelMap,
	Field,
	LAYOUT_VERSION_OFFSET,
	Layout,
	MAGIC_OFFSET,
	MODULE_NAME_OFFSET,
	NUM_MAPS_OFFSET,
	PCB_REV_OFFSET,
};

fn write_field<B: I2c>(eeprom: &mut Eeprom<B>, field: Field, address: u16, data: &[u8]) -> Result<(), Error> {
	eeprom.write_block(address, data).map_err(Error::transport(Phase::Write, field))
}

pub fn program_header<B: I2c>(eeprom: &mut Eeprom<B>, layout: &Layout) -> Result<(), Error> {
	let num_maps = layout.num_maps()?;

	info!("Writing header data...");
	write_field(eeprom, Field::Magic, MAGIC_OFFSET, layout.magic.as_padded())?;
	write_field(eeprom, Field::LayoutVersion, LAYOUT_VERSION_OFFSET, &layout.version.to_bytes())?;
	write_field(eeprom, Field::ModuleName, MODULE_NAME_OFFSET, layout.module_name.as_padded())?;
	write_field(eeprom, Field::PcbRevision, PCB_REV_OFFSET, &[layout.pcb_rev])?;
	write_field(eeprom, Field::NumMaps, NUM_MAPS_OFFSET, &[num_maps])?;

	Ok(())
}

/// Write channel map `index` into its slot. The map is validated before
/// anything is sent to the device.
pub fn program_map<B: I2c>(eeprom: &mut Eeprom<B>, index: usize, map: &ChannelMap) -> Result<(), Error> {
	info!("Writing map {}...", index);
	let slot = map.slot(index, eeprom.config().capacity)?;

	write_field(eeprom, Field::ChannelCount { map: index }, slot.num_chan_address(), &[slot.num_chan])?;
	write_field(eeprom, Field::MapName { map: index }, slot.name_address(), map.name.as_padded())?;
	write_field(eeprom, Field::ChannelTable { map: index }, slot.table_address(), map.channels)?;

	Ok(())
}

/// Write header and all channel maps; aborts at the first error without
/// touching what was already written.
pub fn program_layout<B: I2c>(eeprom: &mut Eeprom<B>, layout: &Layout) -> Result<(), Error> {
	info!("Programming EEPROM with new layout...");
	program_header(eeprom, layout)?;
	for (index, map) in layout.maps.iter().enumerate() {
		program_map(eeprom, index, map)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::eeprom::EepromConfig;
	use crate::error::ConfigurationError;
	use crate::i2c::sim::SimulatedEeprom;
	use crate::layout::{
		FixedStr,
		LayoutVersion,
		MAP_SLOT_SIZE,
		image::OPEN_EPHYS,
	};

	fn eeprom() -> Eeprom<SimulatedEeprom> {
		let config = EepromConfig::default();
		Eeprom::new(SimulatedEeprom::new(&config), config)
	}

	#[test]
	fn builtin_layout_bytes() {
		let mut ee = eeprom();
		program_layout(&mut ee, &OPEN_EPHYS).unwrap();
		let sim = ee.bus();

		assert_eq!(sim.peek(0x0000, 10), b"open-ephys");
		assert_eq!(sim.peek(0x000A, 2), &[1, 0]);
		assert_eq!(&sim.peek(0x000C, 32)[..19], b"Samtec MOLC Module\0");
		assert!(sim.peek(0x000C + 18, 32 - 18).iter().all(|&b| b == 0));
		assert_eq!(sim.peek(0x002C, 1), b"D");
		assert_eq!(sim.peek(0x002D, 1), &[2]);

		assert_eq!(sim.peek(0x0400, 1), &[64]);
		assert_eq!(&sim.peek(0x0401, 32)[..13], b"nanoZ 64 Ch.\0");
		assert_eq!(sim.peek(0x0421, 64), OPEN_EPHYS.maps[0].channels);
		assert_eq!(sim.peek(0x0421, 4), &[32, 33, 34, 35]);
		// untouched past the table
		assert_eq!(sim.peek(0x0461, 1), &[0xff]);

		assert_eq!(sim.peek(0x0800, 1), &[64]);
		assert_eq!(&sim.peek(0x0801, 32)[..19], b"Low profile 64 Ch.\0");
		assert_eq!(sim.peek(0x0821, 64), OPEN_EPHYS.maps[1].channels);

		// header 10 + 2 + 32 + 1 + 1, maps 2 * (1 + 32 + 64)
		assert_eq!(sim.bytes_written(), 46 + 2 * 97);
		// gap between header and first slot stays erased
		assert!(sim.peek(0x002E, 0x0400 - 0x002E).iter().all(|&b| b == 0xff));
	}

	#[test]
	fn channel_ceiling_checked_before_slot_io() {
		let good = [1u8, 2, 3];
		let too_many = [7u8; 200];
		let maps = [
			ChannelMap::new("first", &good),
			ChannelMap::new("second", &too_many),
		];
		let layout = Layout {
			magic: FixedStr::from_str("open-ephys"),
			version: LayoutVersion { major: 1, minor: 0 },
			module_name: FixedStr::from_str("test"),
			pcb_rev: b'A',
			maps: &maps,
		};

		let mut ee = eeprom();
		match program_layout(&mut ee, &layout) {
			Err(Error::Configuration(ConfigurationError::TooManyChannels { map: 1, num_chan: 200 })) => (),
			r => panic!("unexpected result: {:?}", r),
		}

		let sim = ee.bus();
		// header and map 0 made it
		assert_eq!(sim.peek(0x002D, 1), &[2]);
		assert_eq!(sim.peek(0x0400, 1), &[3]);
		// zero bytes in the slot of map 1
		let slot = 0x0400 + MAP_SLOT_SIZE;
		assert!(sim.peek(slot, MAP_SLOT_SIZE as usize).iter().all(|&b| b == 0xff));
	}

	#[test]
	fn ceiling_is_inclusive() {
		let table: Vec<u8> = (0..128).collect();
		let maps = [ChannelMap::new("128", &table)];
		let layout = Layout { maps: &maps, ..OPEN_EPHYS };
		let mut ee = eeprom();
		program_layout(&mut ee, &layout).unwrap();
		assert_eq!(ee.bus().peek(0x0400, 1), &[128]);
		assert_eq!(ee.bus().peek(0x0421, 128), &table[..]);
	}

	#[test]
	fn transport_error_names_field_and_address() {
		let mut ee = eeprom();
		// 6th byte of map 1 name
		ee.bus_mut().fail_write_at(0x0806);

		let err = program_layout(&mut ee, &OPEN_EPHYS).unwrap_err();
		match err {
			Error::Transport { phase: Phase::Write, field: Field::MapName { map: 1 }, ref error } => {
				assert_eq!(error.address(), 0x0806);
			},
			ref r => panic!("unexpected error: {:?}", r),
		}

		let sim = ee.bus();
		assert_eq!(sim.peek(0x0801, 5), b"Low p");
		// nothing after the failing byte
		assert_eq!(sim.peek(0x0806, 1), &[0xff]);
		assert!(sim.peek(0x0821, 64).iter().all(|&b| b == 0xff));
	}

	#[test]
	fn empty_map() {
		let maps = [ChannelMap::new("empty", &[])];
		let layout = Layout { maps: &maps, ..OPEN_EPHYS };
		let mut ee = eeprom();
		program_layout(&mut ee, &layout).unwrap();
		assert_eq!(ee.bus().peek(0x0400, 1), &[0]);
		assert_eq!(ee.bus().peek(0x0421, 1), &[0xff]);
	}

	#[test]
	fn map_past_device_capacity() {
		let table = [0u8; 4];
		let maps = [ChannelMap::new("x", &table); 8];
		let layout = Layout { maps: &maps, ..OPEN_EPHYS };
		let mut ee = eeprom();
		match program_layout(&mut ee, &layout) {
			Err(Error::Configuration(ConfigurationError::MapOutOfRange { map: 7, .. })) => (),
			r => panic!("unexpected result: {:?}", r),
		}
		assert_eq!(ee.bus().peek(0x1C00, 1), &[4]);
	}
}
