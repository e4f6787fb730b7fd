use std::{path::PathBuf, sync::mpsc::Sender, thread, time::Duration};

use crate::{
    disk::FileDisk,
    fs::{config::FsConfig, FileSystem},
    shell::BootProgress,
};

/// 启动线程：打开磁盘镜像并挂载文件系统，进度通过 `tx` 回报给 shell
pub fn perform_disk_initialization(
    tx: Sender<BootProgress>,
    path: PathBuf,
    config: FsConfig,
) {
    let _ = tx.send(BootProgress::Step("🧠 Initializing virtual disk..."));

    let disk = match FileDisk::new(&path, config.geometry, &tx) {
        Ok(d) => d,
        Err(e) => {
            let _ = tx.send(BootProgress::Finished(Err(Box::new(e))));
            return;
        }
    };

    let _ = tx.send(BootProgress::Step("⚙️ Mounting file system..."));

    let mut fs = FileSystem::new(disk, config);
    if let Err(e) = fs.mount() {
        let _ = tx.send(BootProgress::Finished(Err(Box::new(e))));
        return;
    }

    for i in 50..=100 {
        let _ = tx.send(BootProgress::Progress(i));
        thread::sleep(Duration::from_millis(5));
    }

    let _ = tx.send(BootProgress::Finished(Ok(fs)));
}
