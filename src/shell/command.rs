use super::error::ParseError;

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert { key: i64, value: String },
    Delete { key: i64 },
    Search { key: i64 },
    Range { low: i64, high: i64 },
    Show,
    List,
    Stats,
    Check,
    Help,
    Exit,
}

pub const HELP: &str = "\
Commands:
  insert <key> <value>   Insert a key with a value
  delete <key>           Delete a key
  search <key>           Look up a key
  range <low> <high>     List keys with low <= key < high
  show                   Print the tree level by level
  list                   Print every entry in key order
  stats                  Print order, size, height and node count
  check                  Verify the tree's structural invariants
  help                   Show this message
  exit | quit            Leave the shell";

impl Command {
    /// Parse one input line, `None` for a blank line
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let line = line.trim();
        let Some((name, rest)) = split_word(line) else {
            return Ok(None);
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "insert" => {
                let (key, value) = split_word(rest).ok_or(ParseError::MissingArgument {
                    command: "insert",
                    argument: "key",
                })?;
                if value.is_empty() {
                    return Err(ParseError::MissingArgument {
                        command: "insert",
                        argument: "value",
                    });
                }
                Command::Insert {
                    key: parse_key(key)?,
                    value: value.to_string(),
                }
            }
            "delete" => Command::Delete {
                key: single_key("delete", rest)?,
            },
            "search" => Command::Search {
                key: single_key("search", rest)?,
            },
            "range" => {
                let mut args = rest.split_whitespace();
                let low = args.next().ok_or(ParseError::MissingArgument {
                    command: "range",
                    argument: "low key",
                })?;
                let high = args.next().ok_or(ParseError::MissingArgument {
                    command: "range",
                    argument: "high key",
                })?;
                if args.next().is_some() {
                    return Err(ParseError::TooManyArguments("range"));
                }
                Command::Range {
                    low: parse_key(low)?,
                    high: parse_key(high)?,
                }
            }
            "show" => no_args("show", rest, Command::Show)?,
            "list" => no_args("list", rest, Command::List)?,
            "stats" => no_args("stats", rest, Command::Stats)?,
            "check" => no_args("check", rest, Command::Check)?,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            _ => return Err(ParseError::UnknownCommand(name.to_string())),
        };

        Ok(Some(command))
    }
}

/// Split off the first word, returning it and the trimmed remainder
fn split_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((input, "")),
    }
}

fn parse_key(word: &str) -> Result<i64, ParseError> {
    word.parse()
        .map_err(|_| ParseError::InvalidKey(word.to_string()))
}

fn single_key(command: &'static str, rest: &str) -> Result<i64, ParseError> {
    let mut args = rest.split_whitespace();
    let key = args.next().ok_or(ParseError::MissingArgument {
        command,
        argument: "key",
    })?;
    if args.next().is_some() {
        return Err(ParseError::TooManyArguments(command));
    }
    parse_key(key)
}

fn no_args(command: &'static str, rest: &str, parsed: Command) -> Result<Command, ParseError> {
    if rest.is_empty() {
        Ok(parsed)
    } else {
        Err(ParseError::TooManyArguments(command))
    }
}
