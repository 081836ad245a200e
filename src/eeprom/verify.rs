use super::Eeprom;
use crate::error::{
	Error,
	Mismatch,
	Phase,
};
use crate::i2c::I2c;
use crate::layout::{
	ChannelMap,
	Field,
	FixedStr,
	LAYOUT_VERSION_OFFSET,
	Layout,
	LayoutVersion,
	MAGIC_LEN,
	MAGIC_OFFSET,
	NAME_LEN,
	NUM_MAPS_OFFSET,
};

fn read_field<B: I2c>(eeprom: &mut Eeprom<B>, field: Field, address: u16, target: &mut [u8]) -> Result<(), Error> {
	eeprom.read_block(address, target).map_err(Error::transport(Phase::Read, field))
}

fn ensure_eq<T>(field: Field, expected: T, actual: T) -> Result<(), Error>
where
	T: PartialEq + ToString,
{
	if expected != actual {
		return Err(Mismatch {
			field,
			position: None,
			expected: expected.to_string(),
			actual: actual.to_string(),
		}.into());
	}
	Ok(())
}

/// Check magic, layout version and number of maps.
///
/// Module name and PCB revision are written but not read back.
pub fn verify_header<B: I2c>(eeprom: &mut Eeprom<B>, layout: &Layout) -> Result<(), Error> {
	let num_maps = layout.num_maps()?;
	info!("Verifying header data...");

	let mut read_magic = [0u8; MAGIC_LEN];
	read_field(eeprom, Field::Magic, MAGIC_OFFSET, &mut read_magic)?;
	if !layout.magic.eq_full_width(&read_magic) {
		return Err(Mismatch {
			field: Field::Magic,
			position: None,
			expected: format!("'{}'", layout.magic),
			actual: format!("'{}'", FixedStr::from_raw(read_magic)),
		}.into());
	}

	let mut read_version = [0u8; 2];
	read_field(eeprom, Field::LayoutVersion, LAYOUT_VERSION_OFFSET, &mut read_version)?;
	ensure_eq(Field::LayoutVersion, layout.version, LayoutVersion::from_bytes(read_version))?;

	let mut read_num_maps = [0u8];
	read_field(eeprom, Field::NumMaps, NUM_MAPS_OFFSET, &mut read_num_maps)?;
	ensure_eq(Field::NumMaps, num_maps, read_num_maps[0])?;

	info!("Header verification successful!");
	Ok(())
}

/// Check channel count, name and table of map `index`.
pub fn verify_map<B: I2c>(eeprom: &mut Eeprom<B>, index: usize, map: &ChannelMap) -> Result<(), Error> {
	info!("Verifying map {}...", index);
	let slot = map.slot(index, eeprom.config().capacity)?;

	let mut num_chan = [0u8];
	read_field(eeprom, Field::ChannelCount { map: index }, slot.num_chan_address(), &mut num_chan)?;
	ensure_eq(Field::ChannelCount { map: index }, slot.num_chan, num_chan[0])?;

	let mut read_name = [0u8; NAME_LEN];
	read_field(eeprom, Field::MapName { map: index }, slot.name_address(), &mut read_name)?;
	if !map.name.eq_c_str(&read_name) {
		return Err(Mismatch {
			field: Field::MapName { map: index },
			position: None,
			expected: format!("'{}'", map.name),
			actual: format!("'{}'", FixedStr::from_raw(read_name)),
		}.into());
	}

	let field = Field::ChannelTable { map: index };
	let mut chan_map = vec![0u8; map.num_chan()];
	read_field(eeprom, field, slot.table_address(), &mut chan_map)?;
	for (position, (&expected, &actual)) in map.channels.iter().zip(chan_map.iter()).enumerate() {
		if expected != actual {
			return Err(Mismatch {
				field,
				position: Some(position),
				expected: expected.to_string(),
				actual: actual.to_string(),
			}.into());
		}
	}

	info!("Map {} verification successful!", index);
	Ok(())
}

/// Read back everything `program_layout` wrote (except module name and PCB
/// revision) and compare; stops at the first mismatch.
pub fn verify_layout<B: I2c>(eeprom: &mut Eeprom<B>, layout: &Layout) -> Result<(), Error> {
	verify_header(eeprom, layout)?;
	for (index, map) in layout.maps.iter().enumerate() {
		verify_map(eeprom, index, map)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::eeprom::{
		EepromConfig,
		program_layout,
	};
	use crate::error::TransportError;
	use crate::i2c::sim::{
		Event,
		SimulatedEeprom,
	};
	use crate::layout::image::OPEN_EPHYS;

	fn programmed() -> Eeprom<SimulatedEeprom> {
		let config = EepromConfig::default();
		let mut ee = Eeprom::new(SimulatedEeprom::new(&config), config);
		program_layout(&mut ee, &OPEN_EPHYS).unwrap();
		ee.bus_mut().clear_events();
		ee
	}

	fn mismatch(r: Result<(), Error>) -> Mismatch {
		match r {
			Err(Error::Verification(m)) => m,
			r => panic!("expected verification error, got {:?}", r),
		}
	}

	#[test]
	fn round_trip() {
		let mut ee = programmed();
		verify_layout(&mut ee, &OPEN_EPHYS).unwrap();

		// reads only: no writes, no delays
		assert!(ee.bus().events().iter().all(|e| match e {
			Event::Read { .. } => true,
			_ => false,
		}));
		// magic, version, num_maps + 3 reads per map
		assert_eq!(ee.bus().events().len(), 3 + 2 * 3);
	}

	#[test]
	fn magic_compared_full_width() {
		let mut ee = programmed();
		ee.bus_mut().poke(0x0009, b"\0");
		let m = mismatch(verify_layout(&mut ee, &OPEN_EPHYS));
		assert_eq!(m.field, Field::Magic);
		assert_eq!(m.expected, "'open-ephys'");
		assert_eq!(m.actual, "'open-ephy'");
	}

	#[test]
	fn version_mismatch() {
		let mut ee = programmed();
		ee.bus_mut().poke(0x000A, &[2, 1]);
		let m = mismatch(verify_layout(&mut ee, &OPEN_EPHYS));
		assert_eq!(m.field, Field::LayoutVersion);
		assert_eq!(m.to_string(), "layout version verification failed: expected 1.0, got 2.1");
	}

	#[test]
	fn module_name_and_pcb_rev_not_verified() {
		let mut ee = programmed();
		ee.bus_mut().poke(0x000C, b"something else");
		ee.bus_mut().poke(0x002C, b"Z");
		verify_layout(&mut ee, &OPEN_EPHYS).unwrap();
	}

	#[test]
	fn num_maps_mismatch() {
		let mut ee = programmed();
		ee.bus_mut().poke(0x002D, &[3]);
		let m = mismatch(verify_layout(&mut ee, &OPEN_EPHYS));
		assert_eq!(m.field, Field::NumMaps);
		assert_eq!((m.expected.as_str(), m.actual.as_str()), ("2", "3"));
	}

	#[test]
	fn channel_count_mismatch() {
		let mut ee = programmed();
		ee.bus_mut().poke(0x0800, &[63]);
		let m = mismatch(verify_layout(&mut ee, &OPEN_EPHYS));
		assert_eq!(m.field, Field::ChannelCount { map: 1 });
		assert_eq!(m.position, None);
	}

	#[test]
	fn map_name_compared_as_c_string() {
		let mut ee = programmed();
		// garbage behind the terminator is ignored
		ee.bus_mut().poke(0x0401 + 13, b"junk");
		verify_layout(&mut ee, &OPEN_EPHYS).unwrap();

		ee.bus_mut().poke(0x0401, b"N");
		let m = mismatch(verify_layout(&mut ee, &OPEN_EPHYS));
		assert_eq!(m.field, Field::MapName { map: 0 });
		assert_eq!(m.expected, "'nanoZ 64 Ch.'");
		assert_eq!(m.actual, "'NanoZ 64 Ch.'");
	}

	#[test]
	fn first_table_mismatch_reported() {
		let mut ee = programmed();
		ee.bus_mut().poke(0x0821 + 10, &[0]);
		ee.bus_mut().poke(0x0821 + 20, &[0]);
		let m = mismatch(verify_layout(&mut ee, &OPEN_EPHYS));
		assert_eq!(m.field, Field::ChannelTable { map: 1 });
		assert_eq!(m.position, Some(10));
		assert_eq!(m.expected, "75");
		assert_eq!(m.actual, "0");
	}

	#[test]
	fn stops_at_first_mismatch() {
		let mut ee = programmed();
		ee.bus_mut().poke(0x0400, &[1]);
		mismatch(verify_layout(&mut ee, &OPEN_EPHYS));
		// magic, version, num_maps, map 0 channel count; map 1 never read
		assert_eq!(ee.bus().events().len(), 4);
	}

	#[test]
	fn blank_device_fails_on_magic() {
		let config = EepromConfig::default();
		let mut ee = Eeprom::new(SimulatedEeprom::new(&config), config);
		let m = mismatch(verify_layout(&mut ee, &OPEN_EPHYS));
		assert_eq!(m.field, Field::Magic);
	}

	#[test]
	fn read_failure_names_field() {
		let config = EepromConfig::default();
		let sim = SimulatedEeprom::new(&config);
		let mut ee = Eeprom::new(sim, EepromConfig { device_address: 0x51, ..config });
		match verify_layout(&mut ee, &OPEN_EPHYS) {
			Err(Error::Transport { phase: Phase::Read, field: Field::Magic, .. }) => (),
			r => panic!("unexpected result: {:?}", r),
		}
	}

	#[test]
	fn truncated_table_read_names_map() {
		let mut ee = programmed();
		ee.bus_mut().truncate_read_at(0x0821, 40);
		match verify_layout(&mut ee, &OPEN_EPHYS) {
			Err(Error::Transport {
				phase: Phase::Read,
				field: Field::ChannelTable { map: 1 },
				error: TransportError::ShortRead { address: 0x0821, expected: 64, actual: 40 },
			}) => (),
			r => panic!("unexpected result: {:?}", r),
		}
	}
}
