use clap::Parser;

#[derive(Parser)]
#[command(name = "duet-chat")]
#[command(version = "0.3.0")]
#[command(about = "A terminal driver for a streaming two-model AI dialog")]
pub struct Args {
    /// Base URL of the chat server
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub server: String,

    /// Round limit before the dialog pauses (defaults to the server value)
    #[arg(long)]
    pub rounds: Option<u32>,

    /// World-setting context string sent with every request
    #[arg(long)]
    pub world: Option<String>,

    /// Start immediately and exit once the dialog halts
    #[arg(long)]
    pub auto: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// One line of user input in the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Continue,
    Pause,
    /// New round limit; `None` falls back to the server default.
    Rounds(Option<u32>),
    World(String),
    Quit,
}

/// Parse an interactive command line. Unknown or empty input yields `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head.to_lowercase().as_str() {
        "start" | "s" => Some(Command::Start),
        "continue" | "c" => Some(Command::Continue),
        "pause" | "p" => Some(Command::Pause),
        "rounds" => Some(Command::Rounds(rest.parse().ok().filter(|n| *n > 0))),
        "world" => Some(Command::World(rest.to_string())),
        "quit" | "q" | "exit" => Some(Command::Quit),
        _ => None,
    }
}
