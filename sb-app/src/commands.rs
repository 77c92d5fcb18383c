//! Chat command parser.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Exit,
    Switch,
    Empty,
    Say(&'a str),
}

pub fn parse_command(input: &str) -> ChatCommand<'_> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ChatCommand::Empty;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "exit" | "quit" => ChatCommand::Exit,
        "switch" => ChatCommand::Switch,
        _ => ChatCommand::Say(trimmed),
    }
}
