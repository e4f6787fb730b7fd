use log::debug;

use crate::{
    disk::Geometry,
    fs::{
        config::FIRST_FILE_HANDLE,
        error::{FileSystemError, Result},
        file_meta::{FileMeta, MetaTable},
    },
    utils::current_timestamp,
};

/// 打开文件后返回给调用者的句柄
pub type FileHandle = u16;

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub handle: FileHandle,
    pub path: String,
    pub is_open: bool,
    pub length: u32,   // 文件长度（字节），只增不减
    pub position: u32, // 当前扇区内的偏移，等于 SECTOR_SIZE 表示在扇区之后
    pub track: u32,    // 当前物理磁道
    pub sector: u16,   // 当前物理扇区
    pub atime: u64,    // 最后访问时间
    pub mtime: u64,    // 最后修改时间
}

impl FileEntry {
    fn new(handle: FileHandle, path: &str, (track, sector): (u32, u16)) -> Self {
        let now = current_timestamp();
        Self {
            handle,
            path: path.to_string(),
            is_open: true,
            length: 0,
            position: 0,
            track,
            sector,
            atime: now,
            mtime: now,
        }
    }

    // 光标回到文件开头
    fn rewind(&mut self, (track, sector): (u32, u16)) {
        self.position = 0;
        self.track = track;
        self.sector = sector;
    }
}

/// 路径 -> 句柄 -> 文件状态
///
/// 文件项在关闭后仍然保留，直到卸载。
#[derive(Debug)]
pub struct FileTable {
    files: Vec<FileEntry>,
    metas: MetaTable, // 与 files 下标一一对应
    next_handle: FileHandle,
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            metas: MetaTable::new(),
            next_handle: FIRST_FILE_HANDLE,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter()
    }

    pub fn open_handles(&self) -> Vec<FileHandle> {
        self.files
            .iter()
            .filter(|f| f.is_open)
            .map(|f| f.handle)
            .collect()
    }

    pub fn open(&mut self, path: &str, geometry: &Geometry) -> Result<FileHandle> {
        if let Some(index) = self.files.iter().position(|f| f.path == path) {
            if self.files[index].is_open {
                return Err(FileSystemError::FileAlreadyOpen(path.to_string()));
            }
            let start = self.start_of(index);
            let file = &mut self.files[index];
            file.rewind(start);
            file.is_open = true;
            file.atime = current_timestamp();
            debug!("reopened {} as fd {}", path, file.handle);
            return Ok(file.handle);
        }

        let handle = self.next_handle;
        let next = handle
            .checked_add(1)
            .ok_or(FileSystemError::AllocationExhausted)?;

        let index = self.metas.create(geometry)?;
        let start = self.start_of(index);
        self.files.push(FileEntry::new(handle, path, start));
        self.next_handle = next;

        debug!(
            "created {} as fd {} at track {}, sector {}",
            path, handle, start.0, start.1
        );
        Ok(handle)
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        let index = self.lookup(handle)?;
        if !self.files[index].is_open {
            return Err(FileSystemError::FileNotOpen(handle));
        }
        let start = self.start_of(index);
        let file = &mut self.files[index];
        file.rewind(start);
        file.is_open = false;
        debug!("closed {} (fd {})", file.path, handle);
        Ok(())
    }

    pub fn lookup(&self, handle: FileHandle) -> Result<usize> {
        self.files
            .iter()
            .position(|f| f.handle == handle)
            .ok_or(FileSystemError::UnknownHandle(handle))
    }

    /// 查找句柄并要求文件处于打开状态
    pub fn lookup_open(&self, handle: FileHandle) -> Result<usize> {
        let index = self.lookup(handle)?;
        if !self.files[index].is_open {
            return Err(FileSystemError::FileNotOpen(handle));
        }
        Ok(index)
    }

    pub fn entry(&self, index: usize) -> &FileEntry {
        &self.files[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut FileEntry {
        &mut self.files[index]
    }

    pub fn meta(&self, index: usize) -> &FileMeta {
        self.metas.get(index)
    }

    pub fn metas_mut(&mut self) -> &mut MetaTable {
        &mut self.metas
    }

    /// 当前光标对应的文件内绝对偏移
    pub fn offset(&self, index: usize) -> u32 {
        let file = &self.files[index];
        self.metas
            .get(index)
            .logical_offset(file.track, file.sector, file.position)
    }

    fn start_of(&self, index: usize) -> (u32, u16) {
        self.metas.get(index).first().unwrap_or((0, 0))
    }
}
