// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Console command surface.
//!
//! Each input line maps to one [`Command`]. Menu numbers work as aliases
//! for the named commands.

use crate::bluetooth::SPP_MAX_PAYLOAD;

pub const MENU: &str = "\
---------------------SPP MENU-----------------------
    0.  quit            Exit
    1.  menu            Print menu
    2.  bulk            Send large sample data
    3.  send <text>     Send data (less than 1007 bytes)
        status          Show session status
Choose option -> ";

/// Console commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Menu,
    /// Push the configured bulk job.
    Bulk,
    /// Send one frame of text.
    Send(String),
    Status,
}

/// Why a line could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    MissingData,
    TooLong(usize),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty input"),
            Self::Unknown(word) => write!(f, "Invalid input '{}', try again", word),
            Self::MissingData => write!(f, "Enter the data to be sent after 'send'"),
            Self::TooLong(len) => write!(
                f,
                "Data of {} bytes is too long, enter less than {}",
                len, SPP_MAX_PAYLOAD
            ),
        }
    }
}

impl std::error::Error for ParseError {}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "0" | "quit" | "exit" => Ok(Self::Quit),
            "1" | "menu" | "help" => Ok(Self::Menu),
            "2" | "bulk" => Ok(Self::Bulk),
            "3" | "send" => {
                if rest.is_empty() {
                    Err(ParseError::MissingData)
                } else if rest.len() > SPP_MAX_PAYLOAD {
                    Err(ParseError::TooLong(rest.len()))
                } else {
                    Ok(Self::Send(rest.to_string()))
                }
            }
            "status" => Ok(Self::Status),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }

    /// Whether the command needs an active session.
    pub fn needs_session(&self) -> bool {
        matches!(self, Self::Bulk | Self::Send(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_and_numeric() {
        assert_eq!(Command::parse("quit"), Ok(Command::Quit));
        assert_eq!(Command::parse("0"), Ok(Command::Quit));
        assert_eq!(Command::parse(" MENU "), Ok(Command::Menu));
        assert_eq!(Command::parse("2"), Ok(Command::Bulk));
        assert_eq!(Command::parse("bulk"), Ok(Command::Bulk));
        assert_eq!(Command::parse("status"), Ok(Command::Status));
    }

    #[test]
    fn test_parse_send_keeps_text() {
        assert_eq!(
            Command::parse("send hello  world"),
            Ok(Command::Send("hello  world".to_string()))
        );
        assert_eq!(
            Command::parse("3 abc"),
            Ok(Command::Send("abc".to_string()))
        );
        assert_eq!(Command::parse("send"), Err(ParseError::MissingData));
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
        assert_eq!(
            Command::parse("9"),
            Err(ParseError::Unknown("9".to_string()))
        );

        let long = format!("send {}", "x".repeat(SPP_MAX_PAYLOAD + 1));
        assert_eq!(
            Command::parse(&long),
            Err(ParseError::TooLong(SPP_MAX_PAYLOAD + 1))
        );
    }

    #[test]
    fn test_needs_session() {
        assert!(Command::Bulk.needs_session());
        assert!(Command::Send("x".into()).needs_session());
        assert!(!Command::Status.needs_session());
    }
}
