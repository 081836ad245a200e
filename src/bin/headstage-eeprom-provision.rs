#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate headstage_eeprom;
use headstage_eeprom::*;

use std::process::exit;
use std::time::Duration;

use headstage_eeprom::eeprom::read_image;
use headstage_eeprom::i2c::{
	I2c,
	WriteProtect,
	reliable_sleep,
	sim::SimulatedEeprom,
};
use headstage_eeprom::layout::image::OPEN_EPHYS;

const DEFAULT_BUS: &str = "/dev/i2c-1";
const DEFAULT_WP_GPIO: u32 = 5;

fn get_param<T>(matches: &clap::ArgMatches, name: &str, default: T) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(default),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn parse_device_address(s: &str) -> AResult<u8> {
	let address = if s.starts_with("0x") || s.starts_with("0X") {
		u8::from_str_radix(&s[2..], 16)?
	} else {
		s.parse::<u8>()?
	};
	ensure!(address < 0x80, "invalid 7-bit I2C address: 0x{:02x}", address);
	Ok(address)
}

fn eeprom_config(matches: &clap::ArgMatches) -> AResult<EepromConfig> {
	let mut config = EepromConfig::default();
	if let Some(address) = matches.value_of("address") {
		config.device_address = parse_device_address(address).map_err(|e| {
			let msg = format!("invalid parameter address: {}", e);
			failure::Error::from(e.context(msg))
		})?;
	}
	let write_delay: u64 = get_param(matches, "write_delay", config.write_cycle.as_millis() as u64)?;
	config.with_write_cycle(Duration::from_millis(write_delay))
}

fn provision<B: I2c + WriteProtect>(eeprom: Eeprom<B>) -> AResult<Eeprom<B>> {
	let mut provisioner = Provisioner::new(eeprom, &OPEN_EPHYS);
	if let Err(e) = provisioner.run() {
		match provisioner.failed_during() {
			Some(stage) => error!("{} failed: {}", stage, e),
			None => error!("{}", e),
		}
		bail!("EEPROM programming failed");
	}
	info!("All verification successful! EEPROM programming complete.");
	Ok(provisioner.into_eeprom())
}

fn read_back<B: I2c>(eeprom: &mut Eeprom<B>) -> AResult<()> {
	let image = read_image(eeprom, &OPEN_EPHYS.magic)?;
	info!("EEPROM contents: {}", image);
	for (i, map) in image.maps.iter().enumerate() {
		info!("  map {}: '{}', {} channels: {:?}", i, map.name, map.channels.len(), map.channels);
	}

	ensure!(image.matches(&OPEN_EPHYS), "EEPROM layout not up to date");
	info!("EEPROM layout up to date");
	Ok(())
}

#[cfg(target_os = "linux")]
fn open_hardware(matches: &clap::ArgMatches, config: EepromConfig) -> AResult<Eeprom<i2c::linux::LinuxBoard>> {
	let bus = matches.value_of("bus").unwrap_or(DEFAULT_BUS);
	let write_protect = if matches.is_present("no_wp") {
		None
	} else {
		Some(get_param(matches, "wp_gpio", DEFAULT_WP_GPIO)?)
	};
	let board = i2c::linux::open_board(bus, write_protect)?;
	Ok(Eeprom::new(board, config))
}

#[cfg(not(target_os = "linux"))]
fn open_hardware(_matches: &clap::ArgMatches, _config: EepromConfig) -> AResult<Eeprom<SimulatedEeprom>> {
	bail!("I2C hardware access is only implemented for Linux (try --simulate)");
}

fn main_app(matches: &clap::ArgMatches) -> AResult<()> {
	let config = eeprom_config(matches)?;
	let read_only = matches.is_present("read");

	if matches.is_present("simulate") {
		info!("Using simulated EEPROM at 0x{:02x}", config.device_address);
		let sim = SimulatedEeprom::new(&config).with_write_protect(true);
		let mut eeprom = Eeprom::new(sim, config);
		if !read_only {
			eeprom = provision(eeprom)?;
		}
		return read_back(&mut eeprom);
	}

	let mut eeprom = open_hardware(matches, config)?;
	if read_only {
		read_back(&mut eeprom)
	} else {
		provision(eeprom).map(|_| ())
	}
}

fn idle_forever() -> ! {
	loop {
		reliable_sleep(Duration::from_secs(1));
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let matches = clap_app!(@app (app_from_crate!())
		(@arg bus: --bus +takes_value "I2C adapter device (default: /dev/i2c-1)")
		(@arg address: --address +takes_value "7-bit I2C address of the EEPROM (default: 0x50)")
		(@arg wp_gpio: --("wp-gpio") +takes_value "GPIO connected to the EEPROM write-protect pin (default: 5)")
		(@arg no_wp: --("no-wp") conflicts_with[wp_gpio] "Don't drive a write-protect pin")
		(@arg write_delay: --("write-delay") +takes_value "Write cycle time in milliseconds (default and minimum: 5)")
		(@arg simulate: --simulate "Program an in-memory EEPROM instead of hardware")
		(@arg read: --read "Only read the EEPROM and compare it with the built-in layout")
		(@arg exit: --exit "Exit when done instead of idling")
	).get_matches();

	let result = main_app(&matches);
	if let Err(ref e) = result {
		error!("Error: {}", e);
	}

	if matches.is_present("exit") {
		exit(if result.is_ok() { 0 } else { 1 });
	}
	info!("Done; idling.");
	idle_forever();
}
