//! One-shot provisioning run: program the layout, then verify it.
//!
//! `Init → ProgramHeader → ProgramMap(0..n) → VerifyHeader → VerifyMap(0..n) → Idle`
//!
//! Any error moves straight to `Failed`; nothing is retried.

use std::fmt;

use crate::eeprom::{
	Eeprom,
	program_header,
	program_map,
	verify_header,
	verify_map,
};
use crate::error::Error;
use crate::i2c::{
	I2c,
	WriteProtect,
};
use crate::layout::Layout;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Stage {
	Init,
	ProgramHeader,
	ProgramMap(usize),
	VerifyHeader,
	VerifyMap(usize),
	Idle,
	Failed,
}

impl Stage {
	pub fn is_terminal(&self) -> bool {
		match *self {
			Stage::Idle | Stage::Failed => true,
			_ => false,
		}
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Stage::Init => write!(f, "init"),
			Stage::ProgramHeader => write!(f, "program header"),
			Stage::ProgramMap(i) => write!(f, "program map {}", i),
			Stage::VerifyHeader => write!(f, "verify header"),
			Stage::VerifyMap(i) => write!(f, "verify map {}", i),
			Stage::Idle => write!(f, "idle"),
			Stage::Failed => write!(f, "failed"),
		}
	}
}

pub struct Provisioner<'l, B: I2c + WriteProtect> {
	eeprom: Eeprom<B>,
	layout: &'l Layout<'l>,
	stage: Stage,
	failed_during: Option<Stage>,
}

impl<'l, B: I2c + WriteProtect> Provisioner<'l, B> {
	pub fn new(eeprom: Eeprom<B>, layout: &'l Layout<'l>) -> Self {
		Provisioner {
			eeprom,
			layout,
			stage: Stage::Init,
			failed_during: None,
		}
	}

	pub fn stage(&self) -> Stage {
		self.stage
	}

	/// Stage that was running when the run failed.
	pub fn failed_during(&self) -> Option<Stage> {
		self.failed_during
	}

	pub fn eeprom(&self) -> &Eeprom<B> {
		&self.eeprom
	}

	pub fn into_eeprom(self) -> Eeprom<B> {
		self.eeprom
	}

	fn next_map_stage(&self, index: usize, map_stage: fn(usize) -> Stage, done: Stage) -> Stage {
		if index < self.layout.maps.len() {
			map_stage(index)
		} else {
			done
		}
	}

	// run the current stage; returns the following one
	fn execute(&mut self) -> Result<Stage, Error> {
		let layout = self.layout;
		let stage = self.stage;
		let eeprom = &mut self.eeprom;

		Ok(match stage {
			Stage::Init => {
				eeprom.bus_mut().set_write_protect(false).map_err(Error::WriteProtect)?;
				Stage::ProgramHeader
			},
			Stage::ProgramHeader => {
				program_header(eeprom, layout)?;
				self.next_map_stage(0, Stage::ProgramMap, Stage::VerifyHeader)
			},
			Stage::ProgramMap(i) => {
				program_map(eeprom, i, &layout.maps[i])?;
				self.next_map_stage(i + 1, Stage::ProgramMap, Stage::VerifyHeader)
			},
			Stage::VerifyHeader => {
				info!("Write complete. Performing verification...");
				verify_header(eeprom, layout)?;
				self.next_map_stage(0, Stage::VerifyMap, Stage::Idle)
			},
			Stage::VerifyMap(i) => {
				verify_map(eeprom, i, &layout.maps[i])?;
				self.next_map_stage(i + 1, Stage::VerifyMap, Stage::Idle)
			},
			Stage::Idle | Stage::Failed => stage,
		})
	}

	/// Advance by one stage. On error the provisioner ends up in
	/// `Stage::Failed`.
	pub fn step(&mut self) -> Result<Stage, Error> {
		let current = self.stage;
		match self.execute() {
			Ok(next) => {
				debug!("{} -> {}", current, next);
				self.stage = next;
				Ok(next)
			},
			Err(e) => {
				self.stage = Stage::Failed;
				self.failed_during = Some(current);
				Err(e)
			},
		}
	}

	/// Run all remaining stages until `Idle` or the first error.
	pub fn run(&mut self) -> Result<(), Error> {
		while !self.stage.is_terminal() {
			self.step()?;
		}
		Ok(())
	}
}
