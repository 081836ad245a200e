//! In-memory 16-bit addressed I2C EEPROM (AT24C64D behaviour) with a virtual
//! clock.
//!
//! The device doesn't acknowledge anything while it is committing a write
//! (for `write_cycle` after the STOP of a write transaction), mirroring the
//! real part. Nothing sleeps: `delay` only advances the virtual clock.

use std::io;
use std::time::Duration;

use super::{
	I2c,
	Transferred,
	WriteProtect,
};
use crate::eeprom::EepromConfig;

pub const PAGE_SIZE: usize = 32;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Event {
	/// Bytes committed to memory by one write transaction.
	Write {
		at: Duration,
		address: u16,
		data: Vec<u8>,
	},
	Read {
		at: Duration,
		address: u16,
		len: usize,
	},
	/// Device didn't acknowledge its address (busy or wrong address).
	Nak {
		at: Duration,
		device: u8,
	},
	Delay {
		at: Duration,
		duration: Duration,
	},
}

impl Event {
	pub fn at(&self) -> Duration {
		match *self {
			Event::Write { at, .. } => at,
			Event::Read { at, .. } => at,
			Event::Nak { at, .. } => at,
			Event::Delay { at, .. } => at,
		}
	}
}

#[derive(Clone, Debug)]
pub struct SimulatedEeprom {
	device_address: u8,
	memory: Vec<u8>,
	write_cycle: Duration,
	now: Duration,
	busy_until: Duration,
	write_protected: bool,
	faults: Vec<u16>,
	bus_faults: Vec<u16>,
	short_reads: Vec<(u16, usize)>,
	events: Vec<Event>,
}

impl SimulatedEeprom {
	/// Erased (all `0xff`) device matching `config`; not write protected.
	pub fn new(config: &EepromConfig) -> Self {
		assert!(config.capacity.is_power_of_two());
		SimulatedEeprom {
			device_address: config.device_address,
			memory: vec![0xff; config.capacity],
			write_cycle: config.write_cycle,
			now: Duration::from_millis(0),
			busy_until: Duration::from_millis(0),
			write_protected: false,
			faults: Vec::new(),
			bus_faults: Vec::new(),
			short_reads: Vec::new(),
			events: Vec::new(),
		}
	}

	pub fn with_write_protect(mut self, enabled: bool) -> Self {
		self.write_protected = enabled;
		self
	}

	pub fn is_write_protected(&self) -> bool {
		self.write_protected
	}

	/// The data byte for `address` won't be acknowledged (and not stored).
	pub fn fail_write_at(&mut self, address: u16) {
		self.faults.push(address);
	}

	/// Transactions addressing `address` fail on the bus (as the adapter
	/// driver would report it), for writes and reads.
	pub fn fail_bus_at(&mut self, address: u16) {
		self.bus_faults.push(address);
	}

	/// A read starting at `address` stops after `len` bytes.
	pub fn truncate_read_at(&mut self, address: u16, len: usize) {
		self.short_reads.push((address, len));
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn peek(&self, address: u16, len: usize) -> &[u8] {
		let start = address as usize;
		&self.memory[start..start + len]
	}

	/// Change memory behind the protocol's back.
	pub fn poke(&mut self, address: u16, data: &[u8]) {
		let start = address as usize;
		self.memory[start..start + data.len()].copy_from_slice(data);
	}

	pub fn events(&self) -> &[Event] {
		&self.events
	}

	pub fn clear_events(&mut self) {
		self.events.clear();
	}

	/// Number of data bytes committed so far (since the last `clear_events`).
	pub fn bytes_written(&self) -> usize {
		self.events.iter().map(|e| match e {
			Event::Write { data, .. } => data.len(),
			_ => 0,
		}).sum()
	}

	pub fn now(&self) -> Duration {
		self.now
	}

	fn is_busy(&self) -> bool {
		self.now < self.busy_until
	}

	fn mask(&self, address: usize) -> usize {
		address & (self.memory.len() - 1)
	}

	fn bus_fault(&self, address: usize) -> io::Result<()> {
		if self.bus_faults.contains(&(address as u16)) {
			return Err(io::Error::new(io::ErrorKind::Other, format!("bus error at 0x{:04X}", address)));
		}
		Ok(())
	}

	fn acknowledges(&mut self, device: u8) -> bool {
		if device != self.device_address || self.is_busy() {
			self.events.push(Event::Nak { at: self.now, device });
			return false;
		}
		true
	}
}

impl I2c for SimulatedEeprom {
	fn write(&mut self, device: u8, bytes: &[u8]) -> io::Result<usize> {
		if !self.acknowledges(device) {
			return Ok(0);
		}
		if bytes.len() < 2 {
			return Ok(bytes.len());
		}

		let address = self.mask(((bytes[0] as usize) << 8) | bytes[1] as usize);
		self.bus_fault(address)?;
		let page_start = address - address % PAGE_SIZE;
		let mut acknowledged = 2;
		let mut committed = Vec::new();

		for (i, &b) in bytes[2..].iter().enumerate() {
			// address counter rolls over within the page
			let target = page_start + (address - page_start + i) % PAGE_SIZE;
			if self.write_protected || self.faults.contains(&(target as u16)) {
				break;
			}
			self.memory[target] = b;
			committed.push(b);
			acknowledged += 1;
		}

		if !committed.is_empty() {
			self.events.push(Event::Write {
				at: self.now,
				address: address as u16,
				data: committed,
			});
			self.busy_until = self.now + self.write_cycle;
		}

		Ok(acknowledged)
	}

	fn write_read(&mut self, device: u8, bytes: &[u8], target: &mut [u8]) -> io::Result<Transferred> {
		if !self.acknowledges(device) {
			return Ok(Transferred::default());
		}
		if bytes.len() != 2 {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, "expected a 2-byte memory address"));
		}

		let address = self.mask(((bytes[0] as usize) << 8) | bytes[1] as usize);
		self.bus_fault(address)?;
		let len = self.short_reads.iter()
			.filter(|&&(at, _)| at as usize == address)
			.fold(target.len(), |len, &(_, limit)| len.min(limit));

		for (i, t) in target[..len].iter_mut().enumerate() {
			*t = self.memory[self.mask(address + i)];
		}
		self.events.push(Event::Read {
			at: self.now,
			address: address as u16,
			len,
		});

		Ok(Transferred {
			written: 2,
			read: len,
		})
	}

	fn delay(&mut self, duration: Duration) {
		self.events.push(Event::Delay { at: self.now, duration });
		self.now += duration;
	}
}

impl WriteProtect for SimulatedEeprom {
	fn set_write_protect(&mut self, enabled: bool) -> io::Result<()> {
		self.write_protected = enabled;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn device() -> SimulatedEeprom {
		SimulatedEeprom::new(&EepromConfig::default())
	}

	#[test]
	fn starts_erased() {
		let sim = device();
		assert_eq!(sim.memory().len(), 0x2000);
		assert!(sim.memory().iter().all(|&b| b == 0xff));
	}

	#[test]
	fn busy_after_write() {
		let mut sim = device();
		assert_eq!(sim.write(0x50, &[0x00, 0x10, 0xab]).unwrap(), 3);
		assert_eq!(sim.peek(0x0010, 1), &[0xab]);

		// still committing
		assert_eq!(sim.write(0x50, &[0x00, 0x11, 0xcd]).unwrap(), 0);
		let mut buf = [0u8; 1];
		assert_eq!(sim.write_read(0x50, &[0x00, 0x10], &mut buf).unwrap(), Transferred::default());

		sim.delay(Duration::from_millis(5));
		assert_eq!(sim.write_read(0x50, &[0x00, 0x10], &mut buf).unwrap(), Transferred { written: 2, read: 1 });
		assert_eq!(buf, [0xab]);
	}

	#[test]
	fn wrong_device_address() {
		let mut sim = device();
		assert_eq!(sim.write(0x51, &[0x00, 0x00, 0x01]).unwrap(), 0);
		match sim.events() {
			[Event::Nak { device: 0x51, .. }] => (),
			events => panic!("unexpected events: {:?}", events),
		}
	}

	#[test]
	fn write_protect_drops_data() {
		let mut sim = device().with_write_protect(true);
		assert_eq!(sim.write(0x50, &[0x00, 0x00, 0x01]).unwrap(), 2);
		assert_eq!(sim.peek(0x0000, 1), &[0xff]);
		sim.set_write_protect(false).unwrap();
		assert_eq!(sim.write(0x50, &[0x00, 0x00, 0x01]).unwrap(), 3);
		assert_eq!(sim.peek(0x0000, 1), &[0x01]);
	}

	#[test]
	fn page_write_rolls_over() {
		let mut sim = device();
		assert_eq!(sim.write(0x50, &[0x00, 0x1f, 1, 2]).unwrap(), 4);
		assert_eq!(sim.peek(0x001f, 1), &[1]);
		// second byte wrapped to the start of the same page
		assert_eq!(sim.peek(0x0000, 1), &[2]);
		assert_eq!(sim.peek(0x0020, 1), &[0xff]);
	}

	#[test]
	fn injected_fault() {
		let mut sim = device();
		sim.fail_write_at(0x0003);
		assert_eq!(sim.write(0x50, &[0x00, 0x03, 7]).unwrap(), 2);
		assert_eq!(sim.peek(0x0003, 1), &[0xff]);
		assert_eq!(sim.bytes_written(), 0);
	}

	#[test]
	fn injected_bus_error() {
		let mut sim = device();
		sim.fail_bus_at(0x0040);
		let err = sim.write(0x50, &[0x00, 0x40, 1]).unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::Other);
		assert_eq!(sim.peek(0x0040, 1), &[0xff]);

		let mut buf = [0u8; 4];
		assert!(sim.write_read(0x50, &[0x00, 0x40], &mut buf).is_err());
		// other addresses unaffected
		assert_eq!(sim.write(0x50, &[0x00, 0x41, 1]).unwrap(), 3);
	}

	#[test]
	fn truncated_read() {
		let mut sim = device();
		sim.poke(0x0100, &[1, 2, 3, 4]);
		sim.truncate_read_at(0x0100, 2);

		let mut buf = [0u8; 4];
		assert_eq!(sim.write_read(0x50, &[0x01, 0x00], &mut buf).unwrap(), Transferred { written: 2, read: 2 });
		assert_eq!(buf, [1, 2, 0, 0]);
		match sim.events() {
			[Event::Read { address: 0x0100, len: 2, .. }] => (),
			events => panic!("unexpected events: {:?}", events),
		}
	}
}
