use anyhow::{bail, Result};

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Put { key: String, value: String },
    PutFile { key: String, path: String },
    Sync,
    Names,
    Plan,
    List { selector: String },
    Show { name: String },
    Reset,
    Stats,
    Exit,
}

impl Command {
    /// Parses a line. Blank lines yield `Ok(None)`; malformed ones an error
    /// carrying the usage string.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Ok(None);
        };

        let cmd = match cmd.to_uppercase().as_str() {
            "PUT" => {
                let Some(key) = parts.next() else {
                    bail!("usage: PUT key value");
                };
                let value = parts.collect::<Vec<&str>>().join(" ");
                if value.is_empty() {
                    bail!("usage: PUT key value");
                }
                Command::Put {
                    key: key.to_string(),
                    value,
                }
            }
            "PUTFILE" => match (parts.next(), parts.next()) {
                (Some(key), Some(path)) => Command::PutFile {
                    key: key.to_string(),
                    path: path.to_string(),
                },
                _ => bail!("usage: PUTFILE key path"),
            },
            "SYNC" => Command::Sync,
            "NAMES" => Command::Names,
            "PLAN" => Command::Plan,
            "LIST" => Command::List {
                selector: parts.collect::<Vec<&str>>().join(""),
            },
            "SHOW" => match parts.next() {
                Some(name) => Command::Show {
                    name: name.to_string(),
                },
                None => bail!("usage: SHOW name"),
            },
            "RESET" => Command::Reset,
            "STATS" => Command::Stats,
            "EXIT" | "QUIT" => Command::Exit,
            other => bail!("unknown command: {}", other),
        };

        Ok(Some(cmd))
    }
}
