pub mod command;
pub mod controller;
pub mod file_disk;
pub mod init;
pub mod mem_disk;
pub mod types;

pub use command::{decode, encode, Command, CommandWord, Opcode};
pub use controller::Controller;
pub use file_disk::FileDisk;
pub use mem_disk::{DiskStats, MemDisk};
pub use types::{Geometry, Sector, SECTOR_SIZE, SECTORS_PER_TRACK, TRACK_COUNT};
