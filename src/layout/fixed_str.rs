use std::fmt;

/// NUL-padded byte string with a fixed on-device width of `N` bytes.
///
/// `len` counts the meaningful bytes; everything from `len` up to `N` is zero.
/// A string may fill the whole width, in which case it has no terminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize> {
	bytes: [u8; N],
	len: usize,
}

impl<const N: usize> FixedStr<N> {
	/// Build from a string; fails to compile when used in a const context
	/// with a string longer than `N` bytes.
	///
	/// `const NAME: FixedStr<32> = FixedStr::from_str("nanoZ 64 Ch.");`
	pub const fn from_str(s: &str) -> Self {
		let src = s.as_bytes();
		assert!(src.len() <= N);
		let mut bytes = [0u8; N];
		let mut i = 0;
		while i < src.len() {
			bytes[i] = src[i];
			i += 1;
		}
		FixedStr { bytes, len: src.len() }
	}

	/// Returns `None` if `src` doesn't fit into `N` bytes.
	pub fn new(src: &[u8]) -> Option<Self> {
		if src.len() > N {
			return None;
		}
		let mut bytes = [0u8; N];
		bytes[..src.len()].copy_from_slice(src);
		Some(FixedStr { bytes, len: src.len() })
	}

	/// Take raw device bytes; the length ends at the first NUL (or spans the
	/// full width).
	pub fn from_raw(raw: [u8; N]) -> Self {
		let len = c_str_len(&raw);
		FixedStr { bytes: raw, len }
	}

	pub const fn capacity(&self) -> usize {
		N
	}

	pub const fn len(&self) -> usize {
		self.len
	}

	pub const fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// All `N` bytes as stored on the device, padding included.
	pub const fn as_padded(&self) -> &[u8; N] {
		&self.bytes
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes[..self.len]
	}

	/// `memcmp` over the full width: padding bytes must match too.
	pub fn eq_full_width(&self, raw: &[u8]) -> bool {
		raw.len() == N && &self.bytes[..] == raw
	}

	/// `strcmp`-style compare: both sides end at their first NUL.
	pub fn eq_c_str(&self, raw: &[u8]) -> bool {
		let ours = &self.bytes[..c_str_len(&self.bytes)];
		let theirs = &raw[..c_str_len(raw)];
		ours == theirs
	}
}

fn c_str_len(raw: &[u8]) -> usize {
	raw.iter().position(|&b| b == 0).unwrap_or(raw.len())
}

pub(crate) fn escape_bytes(f: &mut fmt::Formatter, bytes: &[u8]) -> fmt::Result {
	for &byte in bytes {
		if byte == 0 {
			write!(f, "\\0")?;
			continue;
		}
		write!(f, "{}", std::ascii::escape_default(byte))?;
	}
	Ok(())
}

impl<const N: usize> fmt::Display for FixedStr<N> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		escape_bytes(f, self.as_bytes())
	}
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "FixedStr<{}>(b\"", N)?;
		escape_bytes(f, self.as_bytes())?;
		write!(f, "\")")
	}
}

impl<const N: usize> AsRef<[u8]> for FixedStr<N> {
	fn as_ref(&self) -> &[u8] {
		self.as_bytes()
	}
}
