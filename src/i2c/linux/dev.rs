use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{
	Path,
	PathBuf,
};

use libc::{
	c_int,
	ioctl,
};

use crate::i2c::{
	I2c,
	Transferred,
};

/* see <linux/i2c-dev.h> and <linux/i2c.h> */
const I2C_RDWR: u32 = 0x0707;
const I2C_M_RD: u16 = 0x0001;
const I2C_RDWR_IOCTL_MAX_MSGS: usize = 42;

#[repr(C)]
struct I2cMsg {
	addr: u16,
	flags: u16,
	len: u16,
	buf: *mut u8,
}

#[repr(C)]
struct I2cRdwrIoctlData {
	msgs: *mut I2cMsg,
	nmsgs: u32,
}

fn msg_len(len: usize) -> io::Result<u16> {
	if len > u16::max_value() as usize {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, "I2C message too long"));
	}
	Ok(len as u16)
}

/// Character device of an I2C adapter (`/dev/i2c-N`).
#[derive(Debug)]
pub struct I2cDev {
	file: fs::File,
	path: PathBuf,
}

impl I2cDev {
	pub fn path(&self) -> &Path {
		&self.path
	}

	// all messages are sent as one combined transaction (repeated START
	// between them, single STOP at the end)
	fn transfer(&mut self, msgs: &mut [I2cMsg]) -> io::Result<()> {
		assert!(msgs.len() <= I2C_RDWR_IOCTL_MAX_MSGS);
		let mut data = I2cRdwrIoctlData {
			msgs: msgs.as_mut_ptr(),
			nmsgs: msgs.len() as u32,
		};
		let res: c_int = unsafe {
			ioctl(self.file.as_raw_fd(), I2C_RDWR as _, &mut data as *mut I2cRdwrIoctlData)
		};
		if res < 0 {
			return Err(io::Error::last_os_error());
		}
		if res as usize != msgs.len() {
			return Err(io::Error::new(io::ErrorKind::Other, format!(
				"only {} of {} I2C messages transferred", res, msgs.len(),
			)));
		}
		Ok(())
	}
}

impl I2c for I2cDev {
	fn write(&mut self, device: u8, bytes: &[u8]) -> io::Result<usize> {
		// the kernel doesn't modify write buffers
		let mut msgs = [I2cMsg {
			addr: device as u16,
			flags: 0,
			len: msg_len(bytes.len())?,
			buf: bytes.as_ptr() as *mut u8,
		}];
		self.transfer(&mut msgs)?;
		Ok(bytes.len())
	}

	fn write_read(&mut self, device: u8, bytes: &[u8], target: &mut [u8]) -> io::Result<Transferred> {
		let mut msgs = [
			I2cMsg {
				addr: device as u16,
				flags: 0,
				len: msg_len(bytes.len())?,
				buf: bytes.as_ptr() as *mut u8,
			},
			I2cMsg {
				addr: device as u16,
				flags: I2C_M_RD,
				len: msg_len(target.len())?,
				buf: target.as_mut_ptr(),
			},
		];
		self.transfer(&mut msgs)?;
		Ok(Transferred {
			written: bytes.len(),
			read: target.len(),
		})
	}
}

pub fn open_i2c_dev<P: AsRef<Path>>(path: P) -> crate::AResult<I2cDev> {
	let path = path.as_ref().to_path_buf();
	with_context!(("couldn't open I2C adapter {}", path.display()), {
		let file = fs::OpenOptions::new().read(true).write(true).open(&path)?;
		Ok(I2cDev { file, path: path.clone() })
	})
}
