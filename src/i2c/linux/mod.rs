use std::io;
use std::time::Duration;

mod dev;
mod gpio;

pub use self::dev::{
	I2cDev,
	open_i2c_dev,
};

pub use self::gpio::{
	SysfsGpio,
	open_output_pin,
};

use crate::i2c::{
	I2c,
	Transferred,
	WriteProtect,
};

/// I2C adapter plus the (optional) GPIO wired to the EEPROM's WP pin.
#[derive(Debug)]
pub struct LinuxBoard {
	pub bus: I2cDev,
	pub write_protect: Option<SysfsGpio>,
}

impl I2c for LinuxBoard {
	fn write(&mut self, device: u8, bytes: &[u8]) -> io::Result<usize> {
		self.bus.write(device, bytes)
	}

	fn write_read(&mut self, device: u8, bytes: &[u8], target: &mut [u8]) -> io::Result<Transferred> {
		self.bus.write_read(device, bytes, target)
	}

	fn delay(&mut self, duration: Duration) {
		self.bus.delay(duration)
	}
}

impl WriteProtect for LinuxBoard {
	fn set_write_protect(&mut self, enabled: bool) -> io::Result<()> {
		match self.write_protect {
			Some(ref mut pin) => pin.set_level(enabled),
			// WP strapped low on the board
			None => Ok(()),
		}
	}
}

pub fn open_board(bus: &str, write_protect_pin: Option<u32>) -> crate::AResult<LinuxBoard> {
	let bus = open_i2c_dev(bus)?;
	let write_protect = match write_protect_pin {
		Some(pin) => Some(open_output_pin(pin)?),
		None => None,
	};
	info!("Using I2C adapter {}", bus.path().display());
	match write_protect {
		Some(ref pin) => info!("EEPROM write protect on GPIO {}", pin.pin()),
		None => info!("EEPROM write protect not controlled"),
	}

	Ok(LinuxBoard { bus, write_protect })
}
