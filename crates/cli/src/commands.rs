/// Interactive commands read from stdin while the detection loop runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    /// Register the current face under the given name. The name is passed
    /// through untrimmed; registration validates it.
    Register(String),
    List,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown command '{0}' (type 'help' for a list)")]
pub struct UnknownCommand(pub String);

pub const HELP: &str = "\
commands:
  start            start periodic detection
  stop             stop periodic detection
  toggle           switch between running and stopped
  register <name>  register the most prominent face under <name>
  list             show registered identities
  help             show this message
  quit             exit";

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, UnknownCommand> {
    let line = line.trim_start();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line.trim_end(), ""));
    let command = match word.to_lowercase().as_str() {
        "" => return Ok(None),
        "start" => Command::Start,
        "stop" => Command::Stop,
        "toggle" => Command::Toggle,
        "register" => Command::Register(rest.to_string()),
        "list" => Command::List,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}
