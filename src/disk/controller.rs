use crate::disk::{command::CommandWord, types::Sector};

/// 设备控制器：唯一的同步调用入口
///
/// 传入命令字和一个扇区大小的缓冲区，返回应答命令字。
/// 读扇区时设备填充 `buf`，写扇区时设备读取 `buf`。
/// 应答中的返回标志为 1 表示命令失败。
pub trait Controller {
    fn syscall(&mut self, cmd: CommandWord, buf: &mut Sector) -> CommandWord;
}

impl<C: Controller + ?Sized> Controller for &mut C {
    fn syscall(&mut self, cmd: CommandWord, buf: &mut Sector) -> CommandWord {
        (**self).syscall(cmd, buf)
    }
}
