use std::fs;
use std::io::{
	self,
	Write,
};
use std::path::{
	Path,
	PathBuf,
};
use std::time::Duration;

use crate::i2c::reliable_sleep;

const SYSFS_GPIO: &str = "/sys/class/gpio";

/// Output pin exported through the (legacy) sysfs GPIO interface.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SysfsGpio {
	pin: u32,
	path: PathBuf,
}

fn write_attribute(path: &Path, value: &str) -> io::Result<()> {
	// one write syscall per attribute
	fs::OpenOptions::new().write(true).open(path)?.write_all(value.as_bytes())
}

impl SysfsGpio {
	pub fn pin(&self) -> u32 {
		self.pin
	}

	pub fn set_level(&mut self, high: bool) -> io::Result<()> {
		write_attribute(&self.path.join("value"), if high { "1" } else { "0" })
	}
}

/// Export `pin` (unless already exported) and configure it as output, driven
/// low.
pub fn open_output_pin(pin: u32) -> crate::AResult<SysfsGpio> {
	let path = Path::new(SYSFS_GPIO).join(format!("gpio{}", pin));

	with_context!(("couldn't set up GPIO {} as output", pin), {
		if !path.exists() {
			write_attribute(&Path::new(SYSFS_GPIO).join("export"), &pin.to_string())?;
			// attributes of the new pin show up asynchronously
			let mut tries = 0;
			while !path.join("direction").exists() {
				tries += 1;
				ensure!(tries < 50, "GPIO {} didn't show up after export", pin);
				reliable_sleep(Duration::from_millis(10));
			}
		}
		// "low" sets direction to output with initial level 0 atomically
		write_attribute(&path.join("direction"), "low")?;
		Ok(())
	})?;

	debug!("GPIO {}: configured as output", pin);

	Ok(SysfsGpio { pin, path })
}
