//! 设备命令字（Command Word）的打包与解包
//!
//! 64 位命令字，从高位到低位：
//!
//! | 字段     | 偏移 | 宽度 |
//! |----------|------|------|
//! | opcode   | 60   | 4    |
//! | sector   | 44   | 16   |
//! | track    | 12   | 32   |
//! | ret      | 11   | 1    |
//!
//! 低 11 位保留不用。

use std::fmt;

/// 命令字中的一个位段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: u32,
    pub width: u32,
}

impl Field {
    pub const fn mask(&self) -> u64 {
        (1u64 << self.width) - 1
    }

    /// 先按宽度截断再移位，越界的输入不会污染相邻字段
    pub const fn pack(&self, value: u64) -> u64 {
        (value & self.mask()) << self.offset
    }

    pub const fn unpack(&self, word: u64) -> u64 {
        (word >> self.offset) & self.mask()
    }
}

pub const OPCODE: Field = Field { offset: 60, width: 4 };
pub const SECTOR: Field = Field { offset: 44, width: 16 };
pub const TRACK: Field = Field { offset: 12, width: 32 };
pub const RETURN: Field = Field { offset: 11, width: 1 };

/// 字段布局表，从高位到低位
pub const LAYOUT: [(&str, Field); 4] = [
    ("opcode", OPCODE),
    ("sector", SECTOR),
    ("track", TRACK),
    ("ret", RETURN),
];

/// 设备操作码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Mount = 0,
    SeekTrack = 1,
    ReadSector = 2,
    WriteSector = 3,
    Unmount = 4,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Mount),
            1 => Ok(Self::SeekTrack),
            2 => Ok(Self::ReadSector),
            3 => Ok(Self::WriteSector),
            4 => Ok(Self::Unmount),
            other => Err(other),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mount => "MOUNT",
            Self::SeekTrack => "TSEEK",
            Self::ReadSector => "RDSECT",
            Self::WriteSector => "WRSECT",
            Self::Unmount => "UMOUNT",
        };
        f.write_str(name)
    }
}

/// 打包后的 64 位命令字
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandWord(pub u64);

impl fmt::Display for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// 解包后的命令字各字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub opcode: u8,
    pub sector: u16,
    pub track: u32,
    pub ret: bool,
}

impl Command {
    pub fn new(opcode: Opcode, sector: u16, track: u32) -> Self {
        Self {
            opcode: opcode as u8,
            sector,
            track,
            ret: false,
        }
    }

    pub fn opcode(&self) -> Result<Opcode, u8> {
        Opcode::try_from(self.opcode)
    }

    pub fn encode(&self) -> CommandWord {
        encode(self.opcode, self.sector, self.track, self.ret)
    }

    /// 设备应答：同一命令，附带返回标志
    pub fn reply(&self, failed: bool) -> CommandWord {
        encode(self.opcode, self.sector, self.track, failed)
    }
}

pub fn encode(opcode: u8, sector: u16, track: u32, ret: bool) -> CommandWord {
    let word = OPCODE.pack(opcode as u64)
        | SECTOR.pack(sector as u64)
        | TRACK.pack(track as u64)
        | RETURN.pack(ret as u64);
    CommandWord(word)
}

pub fn decode(word: CommandWord) -> Command {
    Command {
        opcode: OPCODE.unpack(word.0) as u8,
        sector: SECTOR.unpack(word.0) as u16,
        track: TRACK.unpack(word.0) as u32,
        ret: RETURN.unpack(word.0) == 1,
    }
}
