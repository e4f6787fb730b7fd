//! 扇区缓存
//!
//! 固定容量，按 (track, sector) 索引，LRU 淘汰。
//! 时钟是查询次数（attempts），而不是墙上时间。

use std::fmt;

use log::info;

use crate::disk::{Sector, SECTOR_SIZE};

/// 一个缓存行
#[derive(Debug)]
struct CacheLine {
    track: u32,
    sector: u16,
    last_used: u64,      // 最近一次访问时的 attempts 值
    buffer: Box<Sector>, // 预分配的扇区缓冲区
    occupied: bool,
}

impl CacheLine {
    fn empty() -> Self {
        Self {
            track: 0,
            sector: 0,
            last_used: 0,
            buffer: Box::new([0u8; SECTOR_SIZE]),
            occupied: false,
        }
    }

    fn holds(&self, track: u32, sector: u16) -> bool {
        self.occupied && self.track == track && self.sector == sector
    }
}

/// 命中统计
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub attempts: u64,
}

impl CacheMetrics {
    /// 命中率（百分比），没有任何查询时为 None
    pub fn hit_ratio(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        if total == 0 {
            return None;
        }
        Some(self.hits as f64 / total as f64 * 100.0)
    }
}

impl fmt::Display for CacheMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits: {}, misses: {}, attempts: {}, hit ratio: ",
            self.hits, self.misses, self.attempts
        )?;
        match self.hit_ratio() {
            Some(ratio) => write!(f, "{:.2}%", ratio),
            None => write!(f, "n/a"),
        }
    }
}

#[derive(Debug)]
pub struct SectorCache {
    lines: Vec<CacheLine>,
    metrics: CacheMetrics,
}

impl SectorCache {
    /// capacity 为 0 时缓存关闭，所有查询都是 miss
    pub fn new(capacity: u16) -> Self {
        Self {
            lines: (0..capacity).map(|_| CacheLine::empty()).collect(),
            metrics: CacheMetrics::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lines.len()
    }

    /// 已占用的缓存行数
    pub fn len(&self) -> usize {
        self.lines.iter().filter(|l| l.occupied).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.metrics
    }

    /// 查询扇区，命中时刷新该行的访问时间
    pub fn get(&mut self, track: u32, sector: u16) -> Option<&mut Sector> {
        self.metrics.attempts += 1;
        let clock = self.metrics.attempts;

        match self.lines.iter_mut().find(|l| l.holds(track, sector)) {
            Some(line) => {
                self.metrics.hits += 1;
                line.last_used = clock;
                Some(&mut *line.buffer)
            }
            None => {
                self.metrics.misses += 1;
                None
            }
        }
    }

    /// 不计入统计的存在性检查
    pub fn contains(&self, track: u32, sector: u16) -> bool {
        self.lines.iter().any(|l| l.holds(track, sector))
    }

    /// 放入扇区；缓存已满时覆盖 last_used 最小的行
    ///
    /// 返回被淘汰的 (track, sector)。
    pub fn put(&mut self, track: u32, sector: u16, buf: &Sector) -> Option<(u32, u16)> {
        let clock = self.metrics.attempts;

        // 已存在则原地更新，保证同一扇区只占一行
        let slot = match self.lines.iter().position(|l| l.holds(track, sector)) {
            Some(i) => Some(i),
            None => self
                .lines
                .iter()
                .position(|l| !l.occupied)
                .or_else(|| self.victim()),
        };
        let Some(i) = slot else {
            return None; // 容量为 0
        };

        let line = &mut self.lines[i];
        let evicted = (line.occupied && !line.holds(track, sector))
            .then_some((line.track, line.sector));
        line.track = track;
        line.sector = sector;
        line.last_used = clock;
        line.buffer.copy_from_slice(buf);
        line.occupied = true;
        evicted
    }

    /// 将扇区内容写回已缓存的行，不改变统计和访问时间
    pub fn update(&mut self, track: u32, sector: u16, buf: &Sector) -> bool {
        match self.lines.iter_mut().find(|l| l.holds(track, sector)) {
            Some(line) => {
                line.buffer.copy_from_slice(buf);
                true
            }
            None => false,
        }
    }

    // last_used 最小者，相同时取下标最小的
    fn victim(&self) -> Option<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.occupied)
            .min_by_key(|(i, l)| (l.last_used, *i))
            .map(|(i, _)| i)
    }

    pub fn log_metrics(&self) {
        info!("cache metrics: {}", self.metrics);
    }

    /// 释放所有缓冲区
    pub fn close(&mut self) {
        self.lines.clear();
        self.lines.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(fill: u8) -> Sector {
        [fill; SECTOR_SIZE]
    }

    #[test]
    fn capacity_two_evicts_least_recently_used() {
        let mut cache = SectorCache::new(2);
        assert_eq!(cache.put(1, 1, &sector(1)), None);
        assert_eq!(cache.put(1, 2, &sector(2)), None);
        assert!(cache.get(1, 1).is_some());

        assert_eq!(cache.put(1, 3, &sector(3)), Some((1, 2)));
        assert!(cache.get(1, 2).is_none());
        assert_eq!(cache.get(1, 1).map(|b| b[0]), Some(1));
        assert_eq!(cache.get(1, 3).map(|b| b[0]), Some(3));
    }

    #[test]
    fn hit_ratio_from_scripted_lookups() {
        let mut cache = SectorCache::new(4);
        cache.put(0, 7, &sector(7));
        assert!(cache.get(0, 7).is_some());
        assert!(cache.get(0, 7).is_some());
        assert!(cache.get(0, 8).is_none());
        assert!(cache.get(0, 7).is_some());

        let m = cache.metrics();
        assert_eq!((m.hits, m.misses, m.attempts), (3, 1, 4));
        assert_eq!(m.hit_ratio(), Some(75.0));
    }

    #[test]
    fn hit_ratio_undefined_without_attempts() {
        let cache = SectorCache::new(4);
        assert_eq!(cache.metrics().hit_ratio(), None);
        assert!(cache.metrics().to_string().ends_with("n/a"));
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let mut cache = SectorCache::new(0);
        assert_eq!(cache.put(0, 0, &sector(1)), None);
        assert!(cache.get(0, 0).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.metrics().misses, 1);
    }

    #[test]
    fn occupied_lines_never_exceed_capacity() {
        let mut cache = SectorCache::new(3);
        for i in 0..50u16 {
            if i % 3 == 0 {
                let _ = cache.get(0, i / 2);
            }
            cache.put(i as u32 % 4, i % 7, &sector(i as u8));
            assert!(cache.len() <= cache.capacity());
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn eviction_picks_minimum_last_used() {
        let mut cache = SectorCache::new(3);
        cache.put(0, 0, &sector(0));
        cache.put(0, 1, &sector(1));
        cache.put(0, 2, &sector(2));
        let _ = cache.get(0, 0); // last_used = 1
        let _ = cache.get(0, 2); // last_used = 2
        let _ = cache.get(0, 1); // last_used = 3

        assert_eq!(cache.put(0, 3, &sector(3)), Some((0, 0)));
        assert_eq!(cache.put(0, 4, &sector(4)), Some((0, 2)));
        assert!(cache.contains(0, 1));
    }

    #[test]
    fn ties_broken_by_lowest_slot() {
        let mut cache = SectorCache::new(2);
        cache.put(5, 0, &sector(0));
        cache.put(5, 1, &sector(1));
        // 两行的 last_used 都是 0
        assert_eq!(cache.put(5, 2, &sector(2)), Some((5, 0)));
    }

    #[test]
    fn put_existing_key_updates_in_place() {
        let mut cache = SectorCache::new(2);
        cache.put(1, 1, &sector(1));
        assert_eq!(cache.put(1, 1, &sector(9)), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1, 1).map(|b| b[0]), Some(9));
    }

    #[test]
    fn update_does_not_touch_metrics() {
        let mut cache = SectorCache::new(1);
        cache.put(2, 2, &sector(0));
        assert!(cache.update(2, 2, &sector(4)));
        assert!(!cache.update(2, 3, &sector(4)));
        assert_eq!(cache.metrics().attempts, 0);
        assert_eq!(cache.get(2, 2).map(|b| b[0]), Some(4));
    }

    #[test]
    fn close_releases_lines() {
        let mut cache = SectorCache::new(8);
        cache.put(0, 0, &sector(0));
        cache.close();
        assert_eq!(cache.capacity(), 0);
        assert!(cache.get(0, 0).is_none());
    }
}
