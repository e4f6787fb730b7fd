use serde::{Deserialize, Serialize};

use crate::disk::Geometry;

/// 默认缓存行数
pub const DEFAULT_CACHE_LINES: u16 = 64;

/// 第一个分配给文件的句柄，0/1/2 保留给标准输入输出
pub const FIRST_FILE_HANDLE: u16 = 3;

/// 环境变量：覆盖缓存行数
pub const CACHE_LINES_ENV: &str = "MINIFS_CACHE_LINES";

/// 挂载参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    pub cache_lines: u16, // 0 表示关闭缓存
    pub geometry: Geometry,
}

impl FsConfig {
    pub fn new(cache_lines: u16, geometry: Geometry) -> Self {
        Self {
            cache_lines,
            geometry,
        }
    }

    /// 默认配置，缓存行数可由环境变量覆盖
    pub fn from_env() -> Self {
        let cache_lines = std::env::var(CACHE_LINES_ENV)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_CACHE_LINES);
        Self {
            cache_lines,
            ..Self::default()
        }
    }
}

impl Default for FsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_LINES, Geometry::default())
    }
}
