use std::collections::BTreeMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::disk::{
    command::{decode, CommandWord, Opcode},
    controller::Controller,
    types::{Geometry, Sector, SECTOR_SIZE},
};

/// 设备端计数器，用于观察缓存效果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskStats {
    pub track_seeks: u64,
    pub reads: u64,
    pub writes: u64,
}

/// 内存中的磁道/扇区设备
///
/// 磁道在第一次写入时才分配，未写过的扇区读出全 0。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemDisk {
    geometry: Geometry,
    tracks: BTreeMap<u32, Vec<u8>>, // 磁道号 -> 扁平化的扇区数据
    #[serde(skip)]
    mounted: bool,
    #[serde(skip)]
    current_track: Option<u32>,
    #[serde(skip)]
    stats: DiskStats,
}

impl MemDisk {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            tracks: BTreeMap::new(),
            mounted: false,
            current_track: None,
            stats: DiskStats::default(),
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn stats(&self) -> DiskStats {
        self.stats
    }

    /// 绕过协议直接查看扇区内容
    pub fn peek(&self, track: u32, sector: u16) -> Option<&[u8]> {
        if !self.geometry.contains(track, sector) {
            return None;
        }
        let start = sector as usize * SECTOR_SIZE;
        self.tracks
            .get(&track)
            .map(|data| &data[start..start + SECTOR_SIZE])
    }

    /// 已写入过数据的磁道数
    pub fn tracks_in_use(&self) -> usize {
        self.tracks.len()
    }

    // 当前磁道上的扇区，未选磁道或越界返回 None
    fn locate(&self, sector: u16) -> Option<(u32, usize)> {
        let track = self.current_track?;
        if !self.geometry.contains(track, sector) {
            return None;
        }
        Some((track, sector as usize * SECTOR_SIZE))
    }

    fn read_sector(&mut self, sector: u16, buf: &mut Sector) -> bool {
        let Some((track, start)) = self.locate(sector) else {
            return false;
        };
        match self.tracks.get(&track) {
            Some(data) => buf.copy_from_slice(&data[start..start + SECTOR_SIZE]),
            None => buf.fill(0),
        }
        self.stats.reads += 1;
        true
    }

    fn write_sector(&mut self, sector: u16, buf: &Sector) -> bool {
        let Some((track, start)) = self.locate(sector) else {
            return false;
        };
        let track_len = self.geometry.sectors_per_track as usize * SECTOR_SIZE;
        let data = self
            .tracks
            .entry(track)
            .or_insert_with(|| vec![0u8; track_len]);
        data[start..start + SECTOR_SIZE].copy_from_slice(buf);
        self.stats.writes += 1;
        true
    }
}

impl Controller for MemDisk {
    fn syscall(&mut self, word: CommandWord, buf: &mut Sector) -> CommandWord {
        let cmd = decode(word);

        let ok = match cmd.opcode() {
            Ok(Opcode::Mount) => !std::mem::replace(&mut self.mounted, true),
            Ok(Opcode::Unmount) => {
                let was_mounted = std::mem::replace(&mut self.mounted, false);
                self.current_track = None;
                was_mounted
            }
            Ok(_) if !self.mounted => false,
            Ok(Opcode::SeekTrack) => {
                if cmd.track < self.geometry.tracks {
                    self.current_track = Some(cmd.track);
                    self.stats.track_seeks += 1;
                    true
                } else {
                    false
                }
            }
            Ok(Opcode::ReadSector) => self.read_sector(cmd.sector, buf),
            Ok(Opcode::WriteSector) => self.write_sector(cmd.sector, buf),
            Err(_) => false,
        };

        trace!("memdisk {} -> {}", word, if ok { "ok" } else { "fail" });
        cmd.reply(!ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::command::{Command, Opcode};

    fn call(disk: &mut MemDisk, op: Opcode, sector: u16, track: u32, buf: &mut Sector) -> bool {
        !decode(disk.syscall(Command::new(op, sector, track).encode(), buf)).ret
    }

    #[test]
    fn commands_fail_before_mount() {
        let mut disk = MemDisk::new(Geometry::new(2, 4));
        let mut buf = [0u8; SECTOR_SIZE];
        assert!(!call(&mut disk, Opcode::SeekTrack, 0, 0, &mut buf));
        assert!(call(&mut disk, Opcode::Mount, 0, 0, &mut buf));
        assert!(!call(&mut disk, Opcode::Mount, 0, 0, &mut buf));
    }

    #[test]
    fn write_then_read_sector() {
        let mut disk = MemDisk::new(Geometry::new(2, 4));
        let mut buf = [0u8; SECTOR_SIZE];
        assert!(call(&mut disk, Opcode::Mount, 0, 0, &mut buf));
        // 未选磁道
        assert!(!call(&mut disk, Opcode::ReadSector, 0, 0, &mut buf));
        assert!(call(&mut disk, Opcode::SeekTrack, 0, 1, &mut buf));

        buf.fill(0xAB);
        assert!(call(&mut disk, Opcode::WriteSector, 3, 0, &mut buf));
        let mut out = [0u8; SECTOR_SIZE];
        assert!(call(&mut disk, Opcode::ReadSector, 3, 0, &mut out));
        assert_eq!(out, buf);
        assert_eq!(disk.peek(1, 3), Some(&buf[..]));

        // 越界扇区、越界磁道
        assert!(!call(&mut disk, Opcode::ReadSector, 4, 0, &mut out));
        assert!(!call(&mut disk, Opcode::SeekTrack, 0, 2, &mut out));

        assert_eq!(
            disk.stats(),
            DiskStats {
                track_seeks: 1,
                reads: 1,
                writes: 1
            }
        );
    }

    #[test]
    fn unwritten_sector_reads_zero() {
        let mut disk = MemDisk::new(Geometry::new(1, 2));
        let mut buf = [0xFFu8; SECTOR_SIZE];
        call(&mut disk, Opcode::Mount, 0, 0, &mut buf);
        call(&mut disk, Opcode::SeekTrack, 0, 0, &mut buf);
        assert!(call(&mut disk, Opcode::ReadSector, 1, 0, &mut buf));
        assert!(buf.iter().all(|&b| b == 0));
        assert_eq!(disk.tracks_in_use(), 0);
    }
}
