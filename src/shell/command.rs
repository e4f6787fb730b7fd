use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;

use crate::{
    disk::FileDisk,
    fs::{file_table::FileHandle, FileSystem},
    utils::format_timestamp,
};

#[derive(Debug)]
pub enum Command {
    Help,
    Mount,
    Unmount,
    Open(String),
    Close(FileHandle),
    Read(FileHandle, usize),
    Write(FileHandle, String),
    Seek(FileHandle, u32),
    Stat(FileHandle),
    Ls,
    Cache,
    Format,
    Exit,
}

pub fn execute_command(
    cmd: &Command,
    fs: &mut FileSystem<FileDisk>,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Mount => {
            fs.mount()?;
            println!("💿 {}", "Disk mounted".green());
        }
        Command::Unmount => {
            fs.unmount()?;
            println!("⏏️  {}", "Disk unmounted, image saved".green());
        }
        Command::Open(path) => {
            let fd = fs.open(path)?;
            println!("📂 Opened {} as fd {}", path.cyan(), fd.to_string().bold());
        }
        Command::Close(fd) => {
            fs.close(*fd)?;
            println!("🔒 Closed fd {}", fd);
        }
        Command::Read(fd, count) => {
            let data = fs.read(*fd, *count)?;
            println!("📖 {} bytes:", data.len().to_string().cyan());
            println!("{}", String::from_utf8_lossy(&data));
        }
        Command::Write(fd, content) => {
            let written = fs.write(*fd, content.as_bytes())?;
            println!("{} {} bytes to fd {}", "✅ Wrote".green(), written, fd);
        }
        Command::Seek(fd, offset) => {
            fs.seek(*fd, *offset)?;
            println!("📍 fd {} -> offset {}", fd, offset);
        }
        Command::Stat(fd) => {
            let stat = fs.stat(*fd)?;
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {} bytes\n{}: {}\n{}: {:?} ({} sectors)\n{}: {}\n{}: {}\n",
                "📊 File Info".bright_yellow().bold(),
                "Path".blue(),
                stat.path,
                "State".blue(),
                if stat.is_open { "open" } else { "closed" },
                "Size".blue(),
                stat.length,
                "Offset".blue(),
                stat.offset,
                "Tracks".blue(),
                stat.tracks,
                stat.sectors,
                "Accessed".blue(),
                format_timestamp(stat.atime),
                "Modified".blue(),
                format_timestamp(stat.mtime),
            );
        }
        Command::Ls => {
            let mut any = false;
            for file in fs.files() {
                any = true;
                let state = if file.is_open {
                    "open".green()
                } else {
                    "closed".bright_black()
                };
                println!(
                    "📄  {:<4} {:<24} {:>8} B  {}",
                    file.handle,
                    file.path,
                    file.length,
                    state
                );
            }
            if !any {
                println!("{}", "(no files)".bright_black());
            }
        }
        Command::Cache => {
            let metrics = fs.cache_metrics();
            let stats = fs.disk().stats();
            println!("{}", "🧮 Cache".bright_yellow().bold());
            println!(
                "{}: {}/{}",
                "Lines".blue(),
                fs.cache().len(),
                fs.cache().capacity()
            );
            println!("{}: {}", "Metrics".blue(), metrics);
            println!(
                "{}: {} track seeks, {} reads, {} writes",
                "Device".blue(),
                stats.track_seeks,
                stats.reads,
                stats.writes
            );
        }
        Command::Format => format_disk(fs)?,
        Command::Exit => println!("{}", "👋 Exiting MiniFS shell...".yellow().bold()),
    }

    Ok(())
}

fn format_disk(fs: &mut FileSystem<FileDisk>) -> Result<(), Box<dyn Error>> {
    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Erase volume {}? Every sector in the image will be zeroed",
            fs.disk().volume_id()
        ))
        .default(false)
        .interact()?;
    if !confirmed {
        println!("{}", "Format cancelled".bright_black());
        return Ok(());
    }

    println!("💾 Formatting virtual disk...");
    let pb = ProgressBar::new(3);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.green/black}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    if fs.is_mounted() {
        pb.set_message("unmounting");
        fs.unmount()?;
    }
    pb.inc(1);

    pb.set_message("erasing");
    fs.disk_mut().format()?;
    pb.inc(1);

    pb.set_message("mounting");
    fs.mount()?;
    pb.inc(1);

    pb.finish_with_message("✅ Disk formatted successfully!");
    Ok(())
}

fn print_help() {
    println!("{}", "📘 MiniFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  mount              Mount the disk
  unmount            Close all files, save raw sectors and forget the file table
  open <path>        Open (or create) a file, prints its fd
  close <fd>         Close a file
  read <fd> <n>      Read up to n bytes at the cursor
  write <fd> <str>   Write string at the cursor
  seek <fd> <off>    Move the cursor to an absolute offset
  stat <fd>          Show file info
  ls                 List known files
  cache              Show cache metrics
  format             Zero every sector in the disk image
  help               Show this help message
  exit               Quit the shell
"
        .bright_black()
    );
}
