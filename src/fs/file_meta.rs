//! 地址转换：文件逻辑扇区 <-> 设备物理 (track, sector)

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    disk::{Geometry, SECTOR_SIZE},
    fs::error::{FileSystemError, Result},
};

/// 单个文件的地址映射
///
/// 逻辑磁道 `i` 即 `tracks[i]`，其上的逻辑扇区 `j` 即 `sectors[i][j]`。
/// 每个磁道的扇区数就是 `sectors[i].len()`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    tracks: Vec<u32>,       // 逻辑磁道下标 -> 物理磁道号
    sectors: Vec<Vec<u16>>, // 逻辑磁道下标 -> 物理扇区号列表
}

impl FileMeta {
    /// 新文件：一个磁道、一个扇区
    pub fn new(track: u32, sector: u16) -> Self {
        Self {
            tracks: vec![track],
            sectors: vec![vec![sector]],
        }
    }

    pub fn tracks(&self) -> &[u32] {
        &self.tracks
    }

    pub fn sectors_on(&self, track_index: usize) -> &[u16] {
        self.sectors
            .get(track_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn sector_count(&self, track_index: usize) -> usize {
        self.sectors_on(track_index).len()
    }

    pub fn total_sectors(&self) -> usize {
        self.sectors.iter().map(Vec::len).sum()
    }

    /// 已分配空间（字节）
    pub fn capacity(&self) -> u64 {
        self.total_sectors() as u64 * SECTOR_SIZE as u64
    }

    pub fn first(&self) -> Option<(u32, u16)> {
        self.resolve(0)
    }

    pub fn last_track(&self) -> u32 {
        self.tracks.last().copied().unwrap_or(0)
    }

    pub fn track_index(&self, track: u32) -> Option<usize> {
        self.tracks.iter().position(|&t| t == track)
    }

    /// 扇区在所属磁道内的下标；磁道上尚无记录时为 0
    pub fn sector_index(&self, track: u32, sector: u16) -> usize {
        self.track_index(track)
            .and_then(|ti| self.sectors_on(ti).iter().position(|&s| s == sector))
            .unwrap_or(0)
    }

    /// 跨所有磁道的逻辑扇区号
    pub fn logical_sector(&self, track: u32, sector: u16) -> usize {
        let preceding: usize = match self.track_index(track) {
            Some(ti) => self.sectors[..ti].iter().map(Vec::len).sum(),
            None => 0,
        };
        preceding + self.sector_index(track, sector)
    }

    pub fn logical_offset(&self, track: u32, sector: u16, position: u32) -> u32 {
        (self.logical_sector(track, sector) * SECTOR_SIZE) as u32 + position
    }

    /// 逻辑扇区号 -> 物理地址
    pub fn resolve(&self, logical: usize) -> Option<(u32, u16)> {
        let mut remaining = logical;
        for (ti, sectors) in self.sectors.iter().enumerate() {
            if remaining < sectors.len() {
                return Some((self.tracks[ti], sectors[remaining]));
            }
            remaining -= sectors.len();
        }
        None
    }

    pub fn uses(&self, track: u32, sector: u16) -> bool {
        self.track_index(track)
            .map_or(false, |ti| self.sectors_on(ti).contains(&sector))
    }

    /// 从末尾释放扇区，只保留前 `total` 个；末尾的空磁道一并去掉
    pub fn truncate(&mut self, total: usize) {
        while self.total_sectors() > total {
            if let Some(last) = self.sectors.last_mut() {
                if last.pop().is_none() {
                    self.sectors.pop();
                    self.tracks.pop();
                }
            }
        }
        while self.tracks.len() > 1 && self.sectors.last().map_or(false, Vec::is_empty) {
            self.sectors.pop();
            self.tracks.pop();
        }
    }

    fn push_sector(&mut self, track_index: usize, sector: u16) {
        self.sectors[track_index].push(sector);
    }

    fn push_track(&mut self, track: u32) -> usize {
        self.tracks.push(track);
        self.sectors.push(Vec::new());
        self.tracks.len() - 1
    }
}

/// 找出某磁道上所有文件都未使用的最小扇区号
pub fn lowest_free_sector<'a>(
    metas: impl IntoIterator<Item = &'a FileMeta>,
    track: u32,
    geometry: &Geometry,
) -> Option<u16> {
    if track >= geometry.tracks {
        return None;
    }

    let mut used = vec![false; geometry.sectors_per_track as usize];
    for meta in metas {
        if let Some(ti) = meta.track_index(track) {
            for &s in meta.sectors_on(ti) {
                if let Some(slot) = used.get_mut(s as usize) {
                    *slot = true;
                }
            }
        }
    }

    used.iter().position(|&u| !u).map(|s| s as u16)
}

/// 所有文件的地址映射，下标与文件表一致
#[derive(Debug, Default)]
pub struct MetaTable {
    metas: Vec<FileMeta>,
}

impl MetaTable {
    pub fn new() -> Self {
        Self { metas: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    pub fn get(&self, index: usize) -> &FileMeta {
        &self.metas[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileMeta> {
        self.metas.iter()
    }

    /// 为新文件分配第一个扇区并登记，返回其下标
    pub fn create(&mut self, geometry: &Geometry) -> Result<usize> {
        let (track, sector) = (0..geometry.tracks)
            .find_map(|t| lowest_free_sector(&self.metas, t, geometry).map(|s| (t, s)))
            .ok_or_else(|| {
                warn!("no free sector left for a new file");
                FileSystemError::AllocationExhausted
            })?;

        self.metas.push(FileMeta::new(track, sector));
        Ok(self.metas.len() - 1)
    }

    /// 在文件已有的磁道 `track` 上追加一个空闲扇区
    pub fn allocate_sector(
        &mut self,
        index: usize,
        track: u32,
        geometry: &Geometry,
    ) -> Result<u16> {
        let ti = self.metas[index]
            .track_index(track)
            .ok_or(FileSystemError::AllocationExhausted)?;
        let sector = lowest_free_sector(&self.metas, track, geometry)
            .ok_or(FileSystemError::AllocationExhausted)?;

        self.metas[index].push_sector(ti, sector);
        debug!("file #{} allocated sector {} on track {}", index, sector, track);
        Ok(sector)
    }

    /// 为文件追加磁道 `current_track + 1`
    pub fn allocate_track(
        &mut self,
        index: usize,
        current_track: u32,
        geometry: &Geometry,
    ) -> Result<u32> {
        let track = current_track
            .checked_add(1)
            .filter(|&t| t < geometry.tracks)
            .ok_or(FileSystemError::AllocationExhausted)?;

        self.metas[index].push_track(track);
        debug!("file #{} allocated track {}", index, track);
        Ok(track)
    }

    /// 扩展失败时退回到 `total` 个扇区
    pub fn release(&mut self, index: usize, total: usize) {
        let meta = &mut self.metas[index];
        let freed = meta.total_sectors().saturating_sub(total);
        meta.truncate(total);
        if freed > 0 {
            debug!("file #{} released {} sectors", index, freed);
        }
    }

    /// 扩展一个扇区：先在最后一个磁道上找，不够再换下一个磁道
    pub fn grow(&mut self, index: usize, geometry: &Geometry) -> Result<(u32, u16)> {
        let mut track = self.metas[index].last_track();
        loop {
            match self.allocate_sector(index, track, geometry) {
                Ok(sector) => return Ok((track, sector)),
                Err(FileSystemError::AllocationExhausted) => {
                    track = self.allocate_track(index, track, geometry).map_err(|e| {
                        warn!("file #{} cannot grow past track {}", index, track);
                        e
                    })?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
