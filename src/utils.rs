use chrono::{Local, TimeZone};
use uuid::Uuid;

/// 当前时间（Unix 秒）
pub fn current_timestamp() -> u64 {
    Local::now().timestamp().max(0) as u64
}

/// 把 Unix 秒格式化成本地时间
pub fn format_timestamp(secs: u64) -> String {
    match Local.timestamp_opt(secs as i64, 0).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

/// 生成一个随机唯一 ID
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}
