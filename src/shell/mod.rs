pub mod command;
pub mod logger;
pub mod parse;

use crate::{
    disk::{init::perform_disk_initialization, FileDisk},
    fs::{config::FsConfig, FileSystem},
    shell::{command::execute_command, logger::init_logger, parse::parse_command},
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::{error::Error, io::stdout, path::PathBuf, sync::mpsc, thread};

/// 磁盘镜像文件
const DISK_PATH: &str = "disk.img";

/// 启动线程发回 shell 的进度消息
pub enum BootProgress {
    Step(&'static str),
    Progress(u64),
    Finished(Result<FileSystem<FileDisk>, Box<dyn Error + Send + Sync>>),
}

pub fn start_shell() {
    init_logger();

    let mut fs = match boot() {
        Ok(fs) => fs,
        Err(e) => {
            println!("{} {}", "❌ Boot failed:".red().bold(), e);
            return;
        }
    };

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minifs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => log::warn!("history disabled: {}", e),
    }

    // 命令补全
    let commands = vec![
        "help", "mount", "unmount", "open", "close", "read", "write", "seek", "stat", "ls",
        "cache", "format", "exit",
    ];
    let completer = reedline::DefaultCompleter::new_with_wordlen(
        commands.into_iter().map(String::from).collect(),
        2,
    );
    line_editor = line_editor.with_completer(Box::new(completer));

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(format!(
            "{}@{}",
            username.green().bold(),
            hostname.cyan().bold()
        )),
        DefaultPromptSegment::Basic("MiniFS".bright_blue().bold().to_string()),
    );

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut fs) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if matches!(cmd, command::Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting MiniFS...".yellow());
                break;
            }
            #[allow(unreachable_patterns)]
            Ok(_) => continue,
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    // 退出前卸载，镜像随之写回
    if fs.is_mounted() {
        if let Err(e) = fs.unmount() {
            println!("{} {}", "❌ Unmount failed:".red().bold(), e);
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
}

/// 在后台线程中打开镜像并挂载，前台显示进度条
fn boot() -> Result<FileSystem<FileDisk>, Box<dyn Error>> {
    let mut stdout = stdout();
    execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    println!("{}", "[MiniFS Booting...]".bright_yellow().bold());

    let (tx, rx) = mpsc::channel();
    let config = FsConfig::from_env();
    let worker = thread::spawn(move || {
        perform_disk_initialization(tx, PathBuf::from(DISK_PATH), config)
    });

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("=> "),
    );

    let result = loop {
        match rx.recv() {
            Ok(BootProgress::Step(msg)) => pb.set_message(msg),
            Ok(BootProgress::Progress(p)) => pb.set_position(p),
            Ok(BootProgress::Finished(result)) => break result,
            Err(_) => break Err("boot thread exited unexpectedly".into()),
        }
    };
    let _ = worker.join();

    let fs = match result {
        Ok(fs) => fs,
        Err(e) => {
            pb.abandon_with_message("❌ Boot failed");
            return Err(e.to_string().into());
        }
    };
    pb.finish_with_message("✅ Ready!");

    execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!(
            "Welcome to MiniFS v{} (volume {})\n",
            env!("CARGO_PKG_VERSION"),
            fs.disk().volume_id()
        )),
        ResetColor
    )?;
    Ok(fs)
}
