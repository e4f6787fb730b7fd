use std::{
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter, Result, Write},
    path::{Path, PathBuf},
    sync::mpsc::Sender,
};

use chrono::{DateTime, Local};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::{
    disk::{
        command::{decode, CommandWord, Opcode},
        controller::Controller,
        mem_disk::{DiskStats, MemDisk},
        types::{Geometry, Sector},
    },
    shell::BootProgress,
    utils::generate_uuid,
};

/// 磁盘镜像文件的内容
#[derive(Debug, Serialize, Deserialize)]
struct DiskImage {
    volume_id: String,
    saved_at: Option<DateTime<Local>>,
    disk: MemDisk,
}

/// 以镜像文件持久化的设备
///
/// 运行期间数据保存在内存中，收到卸载命令时整体写回镜像文件。
/// 镜像只保存扇区内容，文件表在每次挂载时重建为空。
#[derive(Debug)]
pub struct FileDisk {
    path: PathBuf,
    image: DiskImage,
}

impl FileDisk {
    pub fn new(
        path: impl AsRef<Path>,
        geometry: Geometry,
        tx: &Sender<BootProgress>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let image = if path.exists() {
            let _ = tx.send(BootProgress::Step("📀 Loading disk image..."));
            let reader = BufReader::new(File::open(&path)?);
            let image: DiskImage = bincode::deserialize_from(reader)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            let _ = tx.send(BootProgress::Progress(40));
            image
        } else {
            let _ = tx.send(BootProgress::Step("🪶 Creating new disk image..."));
            let image = DiskImage::blank(geometry);
            let _ = tx.send(BootProgress::Progress(40));
            image
        };

        info!(
            "disk image {} (volume {}, {} tracks x {} sectors)",
            path.display(),
            image.volume_id,
            image.disk.geometry().tracks,
            image.disk.geometry().sectors_per_track
        );

        Ok(Self { path, image })
    }

    pub fn volume_id(&self) -> &str {
        &self.image.volume_id
    }

    pub fn saved_at(&self) -> Option<DateTime<Local>> {
        self.image.saved_at
    }

    pub fn geometry(&self) -> Geometry {
        self.image.disk.geometry()
    }

    pub fn stats(&self) -> DiskStats {
        self.image.disk.stats()
    }

    /// 清空镜像，生成新的卷标识
    pub fn format(&mut self) -> Result<()> {
        self.image = DiskImage::blank(self.geometry());
        self.sync()
    }

    /// 将镜像写回文件
    pub fn sync(&mut self) -> Result<()> {
        self.image.saved_at = Some(Local::now());
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &self.image)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        writer.flush()
    }
}

impl DiskImage {
    fn blank(geometry: Geometry) -> Self {
        Self {
            volume_id: generate_uuid(),
            saved_at: None,
            disk: MemDisk::new(geometry),
        }
    }
}

impl Controller for FileDisk {
    fn syscall(&mut self, cmd: CommandWord, buf: &mut Sector) -> CommandWord {
        let reply = self.image.disk.syscall(cmd, buf);
        let decoded = decode(reply);

        if !decoded.ret && decoded.opcode() == Ok(Opcode::Unmount) {
            if let Err(e) = self.sync() {
                error!("failed to save disk image {}: {}", self.path.display(), e);
                return decoded.reply(true);
            }
        }
        reply
    }
}
