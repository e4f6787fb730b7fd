use minifs::shell::start_shell;

fn main() {
    start_shell();
}
