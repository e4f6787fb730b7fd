use serde::{Deserialize, Serialize};

/// 每个扇区（Sector）的大小：1KB
/// 设备以“扇区”为最小读写单位。
pub const SECTOR_SIZE: usize = 1024;

/// 默认磁道数
pub const TRACK_COUNT: u32 = 20;

/// 每个磁道默认包含的扇区数
pub const SECTORS_PER_TRACK: u16 = 1024;

/// 一个扇区缓冲区（每块 1KB 的字节数组）
/// 所有设备读写都以 Sector 为单位进行。
pub type Sector = [u8; SECTOR_SIZE];

/// 设备几何参数：磁道数 × 每磁道扇区数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub tracks: u32,
    pub sectors_per_track: u16,
}

impl Geometry {
    pub const fn new(tracks: u32, sectors_per_track: u16) -> Self {
        Self {
            tracks,
            sectors_per_track,
        }
    }

    pub fn contains(&self, track: u32, sector: u16) -> bool {
        track < self.tracks && sector < self.sectors_per_track
    }

    /// 设备总容量（字节）
    pub fn capacity(&self) -> u64 {
        self.tracks as u64 * self.sectors_per_track as u64 * SECTOR_SIZE as u64
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(TRACK_COUNT, SECTORS_PER_TRACK)
    }
}
