use std::fmt;

use crate::{disk::Opcode, fs::file_table::FileHandle};

/// 文件系统错误类型
#[derive(Debug)]
pub enum FileSystemError {
    Io(std::io::Error),                                 // 磁盘镜像读写错误
    AlreadyMounted,                                     // 重复挂载
    NotMounted,                                         // 未挂载
    UnknownHandle(FileHandle),                          // 文件句柄不存在
    FileNotOpen(FileHandle),                            // 文件未打开
    FileAlreadyOpen(String),                            // 文件已打开，带路径
    SeekOutOfRange { offset: u32, length: u32 },        // 定位超出文件长度
    AllocationExhausted,                                // 没有空闲扇区
    Device { opcode: Opcode, track: u32, sector: u16 }, // 设备应答返回失败
}

impl From<std::io::Error> for FileSystemError {
    fn from(e: std::io::Error) -> Self {
        FileSystemError::Io(e)
    }
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Disk I/O error: {}", e),
            Self::AlreadyMounted => write!(f, "Disk is already mounted"),
            Self::NotMounted => write!(f, "Disk is not mounted"),
            Self::UnknownHandle(fd) => write!(f, "Unknown file handle: {}", fd),
            Self::FileNotOpen(fd) => write!(f, "File is not open: {}", fd),
            Self::FileAlreadyOpen(path) => write!(f, "File is already open: {}", path),
            Self::SeekOutOfRange { offset, length } => write!(
                f,
                "Seek offset {} is beyond end of file (length {})",
                offset, length
            ),
            Self::AllocationExhausted => write!(f, "No free sector available"),
            Self::Device {
                opcode,
                track,
                sector,
            } => write!(
                f,
                "Device rejected {} (track {}, sector {})",
                opcode, track, sector
            ),
        }
    }
}

impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;
