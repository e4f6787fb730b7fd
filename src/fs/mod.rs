use log::{debug, info, trace};

use crate::{
    disk::{decode, Command, Controller, Opcode, Sector, SECTOR_SIZE},
    fs::{
        cache::{CacheMetrics, SectorCache},
        config::FsConfig,
        error::{FileSystemError, Result},
        file_table::{FileEntry, FileHandle, FileTable},
    },
};

pub mod cache;
pub mod config;
pub mod error;
pub mod file_io;
pub mod file_meta;
pub mod file_table;

/// 挂载后的文件系统上下文
///
/// 所有状态都在这里，没有全局变量；操作一律通过 `&mut self`。
#[derive(Debug)]
pub struct FileSystem<D: Controller> {
    disk: D,                     // 底层设备
    config: FsConfig,            // 缓存行数、设备几何
    mounted: bool,               // 是否挂载
    files: FileTable,            // 所有文件项及其地址映射
    cache: SectorCache,          // 扇区缓存
    selected_track: Option<u32>, // 设备当前选中的磁道
}

/// 文件状态信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub handle: FileHandle,
    pub path: String,
    pub is_open: bool,
    pub length: u32,
    pub offset: u32,
    pub tracks: Vec<u32>,
    pub sectors: usize,
    pub atime: u64,
    pub mtime: u64,
}

impl<D: Controller> FileSystem<D> {
    pub fn new(disk: D, config: FsConfig) -> Self {
        Self {
            disk,
            config,
            mounted: false,
            files: FileTable::new(),
            cache: SectorCache::new(0),
            selected_track: None,
        }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn disk_mut(&mut self) -> &mut D {
        &mut self.disk
    }

    pub fn into_disk(self) -> D {
        self.disk
    }

    pub fn cache(&self) -> &SectorCache {
        &self.cache
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    pub fn mount(&mut self) -> Result<()> {
        if self.mounted {
            return Err(FileSystemError::AlreadyMounted);
        }

        let mut scratch = [0u8; SECTOR_SIZE];
        self.device_call(Opcode::Mount, 0, 0, &mut scratch)?;

        self.cache = SectorCache::new(self.config.cache_lines);
        self.files = FileTable::new();
        self.selected_track = None;
        self.mounted = true;

        info!(
            "mounted ({} cache lines, {} tracks x {} sectors)",
            self.config.cache_lines,
            self.config.geometry.tracks,
            self.config.geometry.sectors_per_track
        );
        Ok(())
    }

    /// 关闭所有打开的文件，释放文件表和缓存，然后卸载设备
    pub fn unmount(&mut self) -> Result<()> {
        self.ensure_mounted()?;

        for fd in self.files.open_handles() {
            self.files.close(fd)?;
        }
        self.cache.log_metrics();
        self.cache.close();
        self.files = FileTable::new();

        let mut scratch = [0u8; SECTOR_SIZE];
        let result = self.device_call(Opcode::Unmount, 0, 0, &mut scratch);
        self.selected_track = None;
        self.mounted = false;
        info!("unmounted");
        result.map(|_| ())
    }

    pub fn open(&mut self, path: &str) -> Result<FileHandle> {
        self.ensure_mounted()?;
        let geometry = self.config.geometry;
        self.files.open(path, &geometry)
    }

    pub fn close(&mut self, fd: FileHandle) -> Result<()> {
        self.ensure_mounted()?;
        self.files.close(fd)
    }

    pub fn stat(&self, fd: FileHandle) -> Result<FileStat> {
        self.ensure_mounted()?;
        let index = self.files.lookup(fd)?;
        let file = self.files.entry(index);
        let meta = self.files.meta(index);

        Ok(FileStat {
            handle: file.handle,
            path: file.path.clone(),
            is_open: file.is_open,
            length: file.length,
            offset: self.files.offset(index),
            tracks: meta.tracks().to_vec(),
            sectors: meta.total_sectors(),
            atime: file.atime,
            mtime: file.mtime,
        })
    }

    /// 所有已知文件（包括已关闭的）
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter()
    }

    fn ensure_mounted(&self) -> Result<()> {
        if !self.mounted {
            return Err(FileSystemError::NotMounted);
        }
        Ok(())
    }

    // 发送一条命令字并解码应答，返回标志为 1 视为设备错误
    fn device_call(
        &mut self,
        opcode: Opcode,
        sector: u16,
        track: u32,
        buf: &mut Sector,
    ) -> Result<Command> {
        let word = Command::new(opcode, sector, track).encode();
        let reply = decode(self.disk.syscall(word, buf));
        trace!(
            "{} {} (track {}, sector {}) -> ret {}",
            opcode,
            word,
            track,
            sector,
            reply.ret as u8
        );

        if reply.ret {
            return Err(FileSystemError::Device {
                opcode,
                track,
                sector,
            });
        }
        Ok(reply)
    }

    // 只有磁道变化时才发送 seek-to-track
    fn select_track(&mut self, track: u32) -> Result<()> {
        if self.selected_track == Some(track) {
            return Ok(());
        }
        let mut scratch = [0u8; SECTOR_SIZE];
        self.device_call(Opcode::SeekTrack, 0, track, &mut scratch)?;
        self.selected_track = Some(track);
        debug!("device track -> {}", track);
        Ok(())
    }
}
