//! read / write / seek
//!
//! 任意字节范围被切成：当前扇区剩余部分（head）、若干整扇区（full）、
//! 最后一个扇区的开头部分（tail）。每段传输之后都通过 seek 推进光标，
//! 保证下一段总是用最新的物理位置去查地址映射和缓存。

use log::{debug, trace};

use crate::{
    disk::{Controller, Opcode, Sector, SECTOR_SIZE},
    fs::{
        error::{FileSystemError, Result},
        file_table::FileHandle,
        FileSystem,
    },
    utils::current_timestamp,
};

/// 一次传输的扇区切分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    pub head: usize, // 当前扇区内的字节数
    pub full: usize, // 整扇区个数
    pub tail: usize, // 最后一个扇区内的字节数
}

impl TransferPlan {
    pub fn new(position: usize, count: usize) -> Self {
        let room = SECTOR_SIZE - position;
        if count <= room {
            return Self {
                head: count,
                full: 0,
                tail: 0,
            };
        }

        let rest = count - room;
        Self {
            head: room,
            full: rest / SECTOR_SIZE,
            tail: rest % SECTOR_SIZE,
        }
    }

    pub fn total(&self) -> usize {
        self.head + self.full * SECTOR_SIZE + self.tail
    }

    /// 按顺序给出每段的字节数，跳过空段
    pub fn chunks(&self) -> impl Iterator<Item = usize> {
        std::iter::once(self.head)
            .chain(std::iter::repeat(SECTOR_SIZE).take(self.full))
            .chain(std::iter::once(self.tail))
            .filter(|&n| n > 0)
    }
}

impl<D: Controller> FileSystem<D> {
    /// 移动光标到文件内绝对偏移 `offset`，允许等于文件长度
    pub fn seek(&mut self, fd: FileHandle, offset: u32) -> Result<()> {
        self.ensure_mounted()?;
        let index = self.files.lookup_open(fd)?;
        self.seek_index(index, offset)
    }

    /// 从光标处读取至多 `count` 字节，到文件末尾为止
    pub fn read(&mut self, fd: FileHandle, count: usize) -> Result<Vec<u8>> {
        self.ensure_mounted()?;
        let index = self.files.lookup_open(fd)?;

        let offset = self.files.offset(index);
        let available = self.files.entry(index).length.saturating_sub(offset) as usize;
        let count = count.min(available);

        let plan = TransferPlan::new(self.files.entry(index).position as usize, count);
        let mut out = Vec::with_capacity(count);

        for n in plan.chunks() {
            let (track, sector, pos) = self.cursor(index);
            let buf = self.fetch_sector(track, sector)?;
            out.extend_from_slice(&buf[pos..pos + n]);
            self.advance(index, n)?;
        }

        self.files.entry_mut(index).atime = current_timestamp();
        debug!("read {} bytes from fd {} at offset {}", out.len(), fd, offset);
        Ok(out)
    }

    /// 在光标处写入 `data`，必要时扩展文件长度并分配扇区
    pub fn write(&mut self, fd: FileHandle, data: &[u8]) -> Result<usize> {
        self.ensure_mounted()?;
        let index = self.files.lookup_open(fd)?;

        let offset = self.files.offset(index);
        let end = u32::try_from(data.len())
            .ok()
            .and_then(|n| offset.checked_add(n))
            .ok_or(FileSystemError::AllocationExhausted)?;

        if end > self.files.entry(index).length {
            self.reserve(index, end)?;
            self.files.entry_mut(index).length = end;
            // 光标可能停在最后一个扇区之后，扩展后重新落到新扇区上
            self.seek_index(index, offset)?;
        }

        let plan = TransferPlan::new(self.files.entry(index).position as usize, data.len());
        let mut written = 0;

        for n in plan.chunks() {
            let (track, sector, pos) = self.cursor(index);

            // 读-改-写：整扇区暂存，覆盖目标区间，回写缓存和设备
            let mut scratch = self.fetch_sector(track, sector)?;
            scratch[pos..pos + n].copy_from_slice(&data[written..written + n]);
            self.cache.update(track, sector, &scratch);
            self.sector_io(Opcode::WriteSector, track, sector, &mut scratch)?;

            written += n;
            self.advance(index, n)?;
        }

        let now = current_timestamp();
        let file = self.files.entry_mut(index);
        file.atime = now;
        file.mtime = now;
        debug!(
            "wrote {} bytes to fd {} at offset {} (length {})",
            written, fd, offset, file.length
        );
        Ok(written)
    }

    // 光标字段只在这里被修改
    pub(crate) fn seek_index(&mut self, index: usize, offset: u32) -> Result<()> {
        let length = self.files.entry(index).length;
        let out_of_range = || FileSystemError::SeekOutOfRange { offset, length };
        if offset > length {
            return Err(out_of_range());
        }

        let meta = self.files.meta(index);
        let logical = offset as usize / SECTOR_SIZE;
        let (track, sector, position) = match meta.resolve(logical) {
            Some((track, sector)) => (track, sector, offset % SECTOR_SIZE as u32),
            // 长度正好填满已分配的扇区时，文件末尾在最后一个扇区之后
            None if logical > 0 && offset % SECTOR_SIZE as u32 == 0 => {
                let (track, sector) = meta.resolve(logical - 1).ok_or_else(out_of_range)?;
                (track, sector, SECTOR_SIZE as u32)
            }
            None => return Err(out_of_range()),
        };

        let file = self.files.entry_mut(index);
        file.position = position;
        file.track = track;
        file.sector = sector;
        trace!(
            "fd {} cursor -> offset {} (track {}, sector {}, position {})",
            file.handle,
            offset,
            track,
            sector,
            file.position
        );
        Ok(())
    }

    fn cursor(&self, index: usize) -> (u32, u16, usize) {
        let file = self.files.entry(index);
        (file.track, file.sector, file.position as usize)
    }

    fn advance(&mut self, index: usize, n: usize) -> Result<()> {
        let next = self.files.offset(index) + n as u32;
        self.seek_index(index, next)
    }

    // 扩展到能容纳 `end` 字节；失败时归还本次分配的扇区
    fn reserve(&mut self, index: usize, end: u32) -> Result<()> {
        let geometry = self.config.geometry;
        let held = self.files.meta(index).total_sectors();
        while self.files.meta(index).capacity() < end as u64 {
            if let Err(e) = self.files.metas_mut().grow(index, &geometry) {
                self.files.metas_mut().release(index, held);
                return Err(e);
            }
        }
        Ok(())
    }

    // 先查缓存，未命中则从设备读取并放入缓存
    fn fetch_sector(&mut self, track: u32, sector: u16) -> Result<Sector> {
        if let Some(buf) = self.cache.get(track, sector) {
            return Ok(*buf);
        }

        let mut buf = [0u8; SECTOR_SIZE];
        self.sector_io(Opcode::ReadSector, track, sector, &mut buf)?;
        if let Some((t, s)) = self.cache.put(track, sector, &buf) {
            trace!("cache evicted track {}, sector {}", t, s);
        }
        Ok(buf)
    }

    fn sector_io(
        &mut self,
        opcode: Opcode,
        track: u32,
        sector: u16,
        buf: &mut Sector,
    ) -> Result<()> {
        self.select_track(track)?;
        self.device_call(opcode, sector, track, buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disk::{Geometry, MemDisk},
        fs::config::FsConfig,
    };

    fn mounted(cache_lines: u16, geometry: Geometry) -> FileSystem<MemDisk> {
        let config = FsConfig::new(cache_lines, geometry);
        let mut fs = FileSystem::new(MemDisk::new(geometry), config);
        fs.mount().unwrap();
        fs
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn plan_single_sector() {
        let plan = TransferPlan::new(100, 50);
        assert_eq!(plan, TransferPlan { head: 50, full: 0, tail: 0 });
        assert_eq!(plan.chunks().collect::<Vec<_>>(), vec![50]);
    }

    #[test]
    fn plan_spanning_sectors() {
        let plan = TransferPlan::new(1000, 24 + 2 * SECTOR_SIZE + 7);
        assert_eq!(plan, TransferPlan { head: 24, full: 2, tail: 7 });
        assert_eq!(plan.total(), 24 + 2 * SECTOR_SIZE + 7);
        assert_eq!(
            plan.chunks().collect::<Vec<_>>(),
            vec![24, SECTOR_SIZE, SECTOR_SIZE, 7]
        );
        assert_eq!(TransferPlan::new(0, 0).chunks().count(), 0);
    }

    #[test]
    fn seek_bounds() {
        let mut fs = mounted(4, Geometry::new(1, 16));
        let fd = fs.open("/a").unwrap();
        fs.write(fd, &pattern(100, 1)).unwrap();

        fs.seek(fd, 0).unwrap();
        fs.seek(fd, 100).unwrap();
        assert!(matches!(
            fs.seek(fd, 101),
            Err(FileSystemError::SeekOutOfRange { offset: 101, length: 100 })
        ));
        assert!(matches!(fs.seek(fd + 1, 0), Err(FileSystemError::UnknownHandle(_))));
        fs.close(fd).unwrap();
        assert!(matches!(fs.seek(fd, 0), Err(FileSystemError::FileNotOpen(_))));
    }

    #[test]
    fn write_advances_cursor_and_length() {
        let mut fs = mounted(4, Geometry::new(1, 16));
        let fd = fs.open("/a").unwrap();
        assert_eq!(fs.write(fd, &pattern(SECTOR_SIZE + 10, 0)).unwrap(), SECTOR_SIZE + 10);

        let stat = fs.stat(fd).unwrap();
        assert_eq!(stat.length, (SECTOR_SIZE + 10) as u32);
        assert_eq!(stat.offset, stat.length);
        assert_eq!(stat.sectors, 2);

        // 覆盖写不增加长度
        fs.seek(fd, 5).unwrap();
        fs.write(fd, b"xyz").unwrap();
        assert_eq!(fs.stat(fd).unwrap().length, (SECTOR_SIZE + 10) as u32);
        assert_eq!(fs.stat(fd).unwrap().offset, 8);
    }

    #[test]
    fn read_stops_at_end_of_file() {
        let mut fs = mounted(4, Geometry::new(1, 16));
        let fd = fs.open("/a").unwrap();
        fs.write(fd, b"hello").unwrap();
        fs.seek(fd, 2).unwrap();
        assert_eq!(fs.read(fd, 100).unwrap(), b"llo");
        assert!(fs.read(fd, 10).unwrap().is_empty());
    }

    #[test]
    fn closed_file_rejects_io() {
        let mut fs = mounted(4, Geometry::new(1, 16));
        let fd = fs.open("/a").unwrap();
        fs.close(fd).unwrap();
        assert!(matches!(fs.read(fd, 1), Err(FileSystemError::FileNotOpen(_))));
        assert!(matches!(fs.write(fd, b"x"), Err(FileSystemError::FileNotOpen(_))));
        assert!(matches!(fs.read(99, 1), Err(FileSystemError::UnknownHandle(99))));
    }

    #[test]
    fn cache_hits_skip_device_reads() {
        let mut fs = mounted(8, Geometry::new(1, 16));
        let fd = fs.open("/a").unwrap();
        fs.write(fd, &pattern(3 * SECTOR_SIZE, 2)).unwrap();
        let reads_after_write = fs.disk().stats().reads;

        fs.seek(fd, 0).unwrap();
        let data = fs.read(fd, 3 * SECTOR_SIZE).unwrap();
        assert_eq!(data, pattern(3 * SECTOR_SIZE, 2));
        assert_eq!(fs.disk().stats().reads, reads_after_write);
        assert!(fs.cache_metrics().hits >= 3);
    }

    #[test]
    fn zero_cache_still_round_trips() {
        let mut fs = mounted(0, Geometry::new(1, 16));
        let fd = fs.open("/a").unwrap();
        let data = pattern(2 * SECTOR_SIZE + 300, 9);
        fs.write(fd, &data).unwrap();
        fs.seek(fd, 0).unwrap();
        assert_eq!(fs.read(fd, data.len()).unwrap(), data);
        assert_eq!(fs.cache_metrics().hits, 0);
    }

    #[test]
    fn track_seek_sent_only_on_track_change() {
        let mut fs = mounted(0, Geometry::new(2, 4));
        let fd = fs.open("/a").unwrap();
        fs.write(fd, &pattern(2 * SECTOR_SIZE, 0)).unwrap();
        assert_eq!(fs.disk().stats().track_seeks, 1);

        // 第 5 个扇区落在磁道 1 上
        fs.write(fd, &pattern(3 * SECTOR_SIZE, 1)).unwrap();
        assert_eq!(fs.stat(fd).unwrap().tracks, vec![0, 1]);
        assert_eq!(fs.disk().stats().track_seeks, 2);
    }
}
