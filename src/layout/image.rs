//! Layout programmed onto the Samtec MOLC headstage module.

use super::{
	ChannelMap,
	FixedStr,
	Layout,
	LayoutVersion,
};

const CHANNEL_MAP_CNT_A64: [u8; 64] = [
	32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47,
	73, 72, 75, 74, 77, 76, 79, 78, 64, 65, 66, 67, 69, 68, 71, 70,
	48, 49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63,
	89, 88, 91, 90, 93, 92, 95, 94, 80, 81, 82, 83, 85, 84, 87, 86,
];

const CHANNEL_MAP_CNT_HS64: [u8; 64] = [
	78, 94, 79, 95, 76, 92, 77, 93, 74, 90, 75, 91, 72, 88, 73, 89,
	70, 86, 71, 87, 68, 84, 69, 85, 67, 83, 66, 82, 65, 81, 64, 80,
	32, 48, 33, 49, 34, 50, 35, 51, 37, 53, 36, 52, 39, 55, 38, 54,
	41, 57, 40, 56, 43, 59, 42, 58, 45, 61, 44, 60, 47, 63, 46, 62,
];

const MAPS: [ChannelMap<'static>; 2] = [
	ChannelMap::new("nanoZ 64 Ch.", &CHANNEL_MAP_CNT_A64),
	ChannelMap::new("Low profile 64 Ch.", &CHANNEL_MAP_CNT_HS64),
];

pub const OPEN_EPHYS: Layout<'static> = Layout {
	magic: FixedStr::from_str("open-ephys"),
	version: LayoutVersion { major: 1, minor: 0 },
	module_name: FixedStr::from_str("Samtec MOLC Module"),
	pcb_rev: b'D',
	maps: &MAPS,
};
