use crate::protocol::RespValue;
use crate::storage::WrongType;
use thiserror::Error;

/// A command the client sent could not be executed.
///
/// The `Display` text is exactly what goes on the wire after the `-` tag.
/// None of these end the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Request was not a non-empty array of string-like values.
    #[error("ERR invalid command format")]
    InvalidFormat,

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// Holds the lowercase command name.
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error(transparent)]
    WrongType(#[from] WrongType),
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::error(err.to_string())
    }
}
