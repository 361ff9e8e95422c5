//! Interactive stdin commands.

use std::str::FromStr;

use anyhow::{Context, bail};

/// Help text printed by the `help` command.
pub const HELP: &str = "\
Commands:
  check          run one check now
  clear          forget all alerts seen so far
  start          start monitoring
  stop           stop monitoring
  hide           simulate the window going to the background
  show           simulate the window coming back
  interval <ms>  change the check interval (0 = manual only)
  status         print the current state
  state          print the current state as JSON
  help           print this help
  quit           stop monitoring and exit";

/// A command typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Check,
    Clear,
    Start,
    Stop,
    Hide,
    Show,
    Interval(u64),
    Status,
    State,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            bail!("empty command");
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "check" => Command::Check,
            "clear" => Command::Clear,
            "start" => Command::Start,
            "stop" => Command::Stop,
            "hide" => Command::Hide,
            "show" => Command::Show,
            "interval" => {
                let value = words.next().context("usage: interval <ms>")?;
                let ms = value
                    .parse::<u64>()
                    .with_context(|| format!("invalid interval '{}'", value))?;
                Command::Interval(ms)
            }
            "status" => Command::Status,
            "state" => Command::State,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command '{}' (type 'help')", other),
        };

        if words.next().is_some() {
            bail!("too many arguments for '{}'", name);
        }
        Ok(command)
    }
}
