//! Bus capabilities the EEPROM protocol needs from the platform.

use std::io;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

#[cfg(target_os = "linux")]
pub mod linux;
pub mod sim;

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Byte counts of a combined write-then-read transaction.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Transferred {
	pub written: usize,
	pub read: usize,
}

/// Blocking I2C master for 7-bit device addresses.
pub trait I2c {
	/// Write `bytes` in one transaction (terminated with STOP); returns the
	/// number of bytes the device acknowledged.
	fn write(&mut self, device: u8, bytes: &[u8]) -> io::Result<usize>;

	/// Write `bytes`, then (repeated START, no STOP in between) read
	/// `target.len()` bytes.
	fn write_read(&mut self, device: u8, bytes: &[u8], target: &mut [u8]) -> io::Result<Transferred>;

	// delay for (at least) `duration`
	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

/// Write-protect pin of the EEPROM.
pub trait WriteProtect {
	fn set_write_protect(&mut self, enabled: bool) -> io::Result<()>;
}

impl<'a, B: ?Sized + I2c> I2c for &'a mut B {
	fn write(&mut self, device: u8, bytes: &[u8]) -> io::Result<usize> {
		B::write(*self, device, bytes)
	}
	fn write_read(&mut self, device: u8, bytes: &[u8], target: &mut [u8]) -> io::Result<Transferred> {
		B::write_read(*self, device, bytes, target)
	}
	fn delay(&mut self, duration: Duration) {
		B::delay(*self, duration)
	}
}

impl<'a, P: ?Sized + WriteProtect> WriteProtect for &'a mut P {
	fn set_write_protect(&mut self, enabled: bool) -> io::Result<()> {
		P::set_write_protect(*self, enabled)
	}
}
