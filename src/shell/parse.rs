use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];

    match cmd {
        "help" => Some(Command::Help),
        "mount" => Some(Command::Mount),
        "unmount" | "umount" => Some(Command::Unmount),
        "open" => args.first().map(|&path| Command::Open(path.to_string())),
        "close" => Some(Command::Close(args.first()?.parse().ok()?)),
        "read" => Some(Command::Read(
            args.first()?.parse().ok()?,
            args.get(1)?.parse().ok()?,
        )),
        "write" => {
            if args.len() >= 2 {
                Some(Command::Write(args[0].parse().ok()?, args[1..].join(" ")))
            } else {
                None
            }
        }
        "seek" => Some(Command::Seek(
            args.first()?.parse().ok()?,
            args.get(1)?.parse().ok()?,
        )),
        "stat" => Some(Command::Stat(args.first()?.parse().ok()?)),
        "ls" => Some(Command::Ls),
        "cache" => Some(Command::Cache),
        "format" => Some(Command::Format),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_commands() {
        assert!(matches!(parse_command("open /a.txt"), Some(Command::Open(p)) if p == "/a.txt"));
        assert!(matches!(parse_command("read 3 100"), Some(Command::Read(3, 100))));
        assert!(matches!(
            parse_command("write 4 hello  world"),
            Some(Command::Write(4, s)) if s == "hello world"
        ));
        assert!(matches!(parse_command("seek 3 0"), Some(Command::Seek(3, 0))));
        assert!(matches!(parse_command("umount"), Some(Command::Unmount)));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_command("read x 1").is_none());
        assert!(parse_command("write 3").is_none());
        assert!(parse_command("close").is_none());
        assert!(parse_command("rm /a").is_none());
        assert!(parse_command("   ").is_none());
    }
}
