//! # Wire commands sent by clients.
//!
//! ```text
//! {"command": "watch",   "hashtag": "beer"}
//! {"command": "unwatch", "hashtag": "beer"}
//! ```
//!
//! Unknown fields are ignored. Decoding distinguishes a payload that is not a
//! command object at all, an unknown command name, and a missing or blank slug.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CommandError;

/// What a client asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Subscribe to a source and make sure it is polled.
    Watch,
    /// Unsubscribe and stop polling the source.
    Unwatch,
}

impl CommandKind {
    /// Wire name of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Watch => "watch",
            CommandKind::Unwatch => "unwatch",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watch" => Ok(CommandKind::Watch),
            "unwatch" => Ok(CommandKind::Unwatch),
            other => Err(CommandError::UnknownCommand {
                command: other.to_string(),
            }),
        }
    }
}

/// A decoded client command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Requested action.
    #[serde(rename = "command")]
    pub kind: CommandKind,
    /// Source slug as sent by the client (not normalized).
    #[serde(rename = "hashtag")]
    pub slug: String,
}

#[derive(Deserialize)]
struct RawCommand {
    command: Option<String>,
    hashtag: Option<String>,
}

impl Command {
    /// Creates a command.
    pub fn new(kind: CommandKind, slug: impl Into<String>) -> Self {
        Self {
            kind,
            slug: slug.into(),
        }
    }

    /// Decodes a JSON payload.
    ///
    /// # Errors
    /// - [`CommandError::Malformed`]: not a JSON object, or no `command` field
    /// - [`CommandError::UnknownCommand`]: `command` is neither `watch` nor `unwatch`
    /// - [`CommandError::MissingSlug`]: `hashtag` absent or blank
    ///
    /// ```
    /// use watchhub::{Command, CommandKind};
    ///
    /// let cmd = Command::decode(br##"{"command":"watch","hashtag":"#beer"}"##).unwrap();
    /// assert_eq!(cmd.kind, CommandKind::Watch);
    /// assert_eq!(cmd.slug, "#beer");
    /// ```
    pub fn decode(payload: &[u8]) -> Result<Self, CommandError> {
        let malformed = |e: serde_json::Error| CommandError::Malformed {
            error: e.to_string(),
        };
        // A struct would also deserialize from a JSON array.
        let object: Map<String, Value> = serde_json::from_slice(payload).map_err(malformed)?;
        let raw: RawCommand = serde_json::from_value(Value::Object(object)).map_err(malformed)?;

        let kind = raw
            .command
            .ok_or_else(|| CommandError::Malformed {
                error: "missing field `command`".to_string(),
            })?
            .parse::<CommandKind>()?;

        match raw.hashtag {
            Some(slug) if !slug.trim().is_empty() => Ok(Self { kind, slug }),
            _ => Err(CommandError::MissingSlug),
        }
    }

    /// Encodes the command in its wire form.
    ///
    /// # Errors
    /// Returns the `serde_json` error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
