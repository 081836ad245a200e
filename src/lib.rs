#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod eeprom;
pub mod error;
pub mod i2c;
pub mod layout;
pub mod provision;

pub use self::eeprom::{
	Eeprom,
	EepromConfig,
};

pub use self::error::{
	ConfigurationError,
	Error,
	Mismatch,
	Phase,
	TransportError,
};

pub use self::layout::{
	ChannelMap,
	Field,
	FixedStr,
	Layout,
	LayoutVersion,
};

pub use self::provision::{
	Provisioner,
	Stage,
};
