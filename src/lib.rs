//! MiniFS：在磁道/扇区设备之上提供 open/read/write/seek/close 文件接口
//!
//! 设备只通过一个同步调用访问：传入 64 位命令字和一个扇区缓冲区，返回应答命令字。

pub mod disk;
pub mod fs;
pub mod shell;
pub mod utils;

pub use crate::disk::{Controller, FileDisk, Geometry, MemDisk, SECTOR_SIZE};
pub use crate::fs::{
    config::FsConfig,
    error::{FileSystemError, Result},
    file_table::FileHandle,
    FileStat, FileSystem,
};
