use colored::*;
use log::{Level, LevelFilter, Metadata, Record};

/// 环境变量：日志级别（error/warn/info/debug/trace/off）
pub const LOG_ENV: &str = "MINIFS_LOG";

static LOGGER: ShellLogger = ShellLogger;
struct ShellLogger;

impl log::Log for ShellLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // 只输出本 crate 的日志，reedline 等依赖的日志忽略
        metadata.level() <= log::max_level() && metadata.target().starts_with("minifs")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green(),
            Level::Debug => "DEBUG".blue(),
            Level::Trace => "TRACE".bright_black(),
        };
        eprintln!("[{}] {}", level, record.args());
    }

    fn flush(&self) {}
}

/// 安装日志（启动时调用一次）
pub fn init_logger() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);

    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
