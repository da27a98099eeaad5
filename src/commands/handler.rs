//! Command Handler
//!
//! Turns one decoded request into one reply. Every request goes through the
//! same pipeline:
//!
//! 1. **Shape**: a non-empty array of bulk strings (simple strings and
//!    integers are accepted as their text)
//! 2. **Name**: matched case-sensitively against the command table
//! 3. **Arity**: exact or minimum argument count per command
//! 4. **Key type**: typed commands reject keys holding another kind
//!
//! A failure at any step becomes an error reply; the connection stays open.
//!
//! ## Supported Commands
//!
//! ### Strings and keys
//! - `PING [message]`, `SET key value`, `GET key`, `DEL key`, `TYPE key`
//! - `EXPIRE key seconds`, `PEXPIRE key ms`, `TTL key`, `PTTL key`, `PERSIST key`
//!
//! ### Lists
//! - `LPUSH key value [value ...]`, `RPUSH key value [value ...]`
//! - `LPOP key`, `RPOP key`, `LLEN key`, `LRANGE key start stop`
//!
//! ### Sets
//! - `SADD key member [member ...]`, `SREM key member [member ...]`
//! - `SISMEMBER key member`, `SMEMBERS key`, `SCARD key`
//!
//! ### Hashes
//! - `HSET key field value [field value ...]`, `HGET key field`
//! - `HDEL key field [field ...]`, `HGETALL key`, `HLEN key`
//!
//! ### Connection
//! - `QUIT` replies `+OK` and asks the caller to close the connection

use crate::commands::error::CommandError;
use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

type CommandResult = Result<RespValue, CommandError>;

/// The outcome of dispatching one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub reply: RespValue,

    /// The connection must be closed after `reply` is written.
    pub close: bool,
}

impl Response {
    fn reply(reply: RespValue) -> Self {
        Self {
            reply,
            close: false,
        }
    }
}

/// Executes commands against a shared [`StorageEngine`].
///
/// Cheap to clone; every connection gets its own handle.
#[derive(Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes a command and returns only the reply.
    pub fn execute(&self, command: RespValue) -> RespValue {
        self.dispatch(command).reply
    }

    /// Executes a command.
    ///
    /// Never fails: malformed requests and command errors produce an error
    /// reply. `close` is set only by `QUIT`.
    pub fn dispatch(&self, command: RespValue) -> Response {
        let mut args = match command_args(command) {
            Ok(args) => args,
            Err(err) => return Response::reply(err.into()),
        };

        let name = args.remove(0);
        trace!(command = %String::from_utf8_lossy(&name), args = args.len(), "dispatch");

        if &name[..] == b"QUIT" {
            return match args.len() {
                0 => Response {
                    reply: RespValue::ok(),
                    close: true,
                },
                _ => Response::reply(CommandError::WrongArity("quit").into()),
            };
        }

        let result = match &name[..] {
            b"PING" => self.cmd_ping(&args),
            b"SET" => self.cmd_set(&args),
            b"GET" => self.cmd_get(&args),
            b"DEL" => self.cmd_del(&args),
            b"TYPE" => self.cmd_type(&args),

            b"EXPIRE" => self.cmd_expire(&args, Duration::from_secs, "expire"),
            b"PEXPIRE" => self.cmd_expire(&args, Duration::from_millis, "pexpire"),
            b"TTL" => self.cmd_ttl(&args),
            b"PTTL" => self.cmd_pttl(&args),
            b"PERSIST" => self.cmd_persist(&args),

            b"LPUSH" => self.cmd_lpush(&args),
            b"RPUSH" => self.cmd_rpush(&args),
            b"LPOP" => self.cmd_lpop(&args),
            b"RPOP" => self.cmd_rpop(&args),
            b"LLEN" => self.cmd_llen(&args),
            b"LRANGE" => self.cmd_lrange(&args),

            b"SADD" => self.cmd_sadd(&args),
            b"SREM" => self.cmd_srem(&args),
            b"SISMEMBER" => self.cmd_sismember(&args),
            b"SMEMBERS" => self.cmd_smembers(&args),
            b"SCARD" => self.cmd_scard(&args),

            b"HSET" => self.cmd_hset(&args),
            b"HGET" => self.cmd_hget(&args),
            b"HDEL" => self.cmd_hdel(&args),
            b"HGETALL" => self.cmd_hgetall(&args),
            b"HLEN" => self.cmd_hlen(&args),

            _ => Err(CommandError::UnknownCommand(
                String::from_utf8_lossy(&name).into_owned(),
            )),
        };

        Response::reply(result.unwrap_or_else(RespValue::from))
    }

    // ========================================================================
    // Server commands
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, args: &[Bytes]) -> CommandResult {
        match args {
            [] => Ok(RespValue::pong()),
            [message] => Ok(RespValue::bulk_string(message.clone())),
            _ => Err(CommandError::WrongArity("ping")),
        }
    }

    // ========================================================================
    // String and key commands
    // ========================================================================

    /// SET key value
    fn cmd_set(&self, args: &[Bytes]) -> CommandResult {
        let [key, value] = args else {
            return Err(CommandError::WrongArity("set"));
        };
        self.storage.set_string(key.clone(), value.clone());
        Ok(RespValue::ok())
    }

    /// GET key
    ///
    /// A key holding another kind reads as absent.
    fn cmd_get(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("get"));
        };
        Ok(self
            .storage
            .get_string(key)
            .map(RespValue::bulk_string)
            .unwrap_or_else(RespValue::null))
    }

    /// DEL key
    fn cmd_del(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("del"));
        };
        Ok(RespValue::integer(self.storage.delete(key) as i64))
    }

    /// TYPE key
    fn cmd_type(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("type"));
        };
        Ok(RespValue::simple_string(self.storage.key_type(key)))
    }

    /// EXPIRE key seconds / PEXPIRE key milliseconds
    ///
    /// A TTL of zero or less deletes the key straight away.
    fn cmd_expire(
        &self,
        args: &[Bytes],
        unit: fn(u64) -> Duration,
        name: &'static str,
    ) -> CommandResult {
        let [key, ttl] = args else {
            return Err(CommandError::WrongArity(name));
        };
        let ttl = parse_integer(ttl)?;

        if ttl <= 0 {
            return Ok(RespValue::integer(self.storage.delete(key) as i64));
        }

        let at = Instant::now()
            .checked_add(unit(ttl as u64))
            .ok_or(CommandError::NotAnInteger)?;
        Ok(RespValue::integer(self.storage.expire_at(key, at) as i64))
    }

    /// TTL key
    fn cmd_ttl(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("ttl"));
        };
        Ok(RespValue::integer(self.storage.ttl(key).unwrap_or(-2)))
    }

    /// PTTL key
    fn cmd_pttl(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("pttl"));
        };
        Ok(RespValue::integer(self.storage.pttl(key).unwrap_or(-2)))
    }

    /// PERSIST key
    fn cmd_persist(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("persist"));
        };
        Ok(RespValue::integer(self.storage.persist(key) as i64))
    }

    // ========================================================================
    // List commands
    // ========================================================================

    /// LPUSH key value [value ...]
    fn cmd_lpush(&self, args: &[Bytes]) -> CommandResult {
        let [key, values @ ..] = args else {
            return Err(CommandError::WrongArity("lpush"));
        };
        if values.is_empty() {
            return Err(CommandError::WrongArity("lpush"));
        }
        let len = self.storage.lpush(key.clone(), values.to_vec())?;
        Ok(RespValue::integer(len as i64))
    }

    /// RPUSH key value [value ...]
    fn cmd_rpush(&self, args: &[Bytes]) -> CommandResult {
        let [key, values @ ..] = args else {
            return Err(CommandError::WrongArity("rpush"));
        };
        if values.is_empty() {
            return Err(CommandError::WrongArity("rpush"));
        }
        let len = self.storage.rpush(key.clone(), values.to_vec())?;
        Ok(RespValue::integer(len as i64))
    }

    /// LPOP key
    fn cmd_lpop(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("lpop"));
        };
        Ok(bulk_or_null(self.storage.lpop(key)?))
    }

    /// RPOP key
    fn cmd_rpop(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("rpop"));
        };
        Ok(bulk_or_null(self.storage.rpop(key)?))
    }

    /// LLEN key
    fn cmd_llen(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("llen"));
        };
        Ok(RespValue::integer(self.storage.llen(key)? as i64))
    }

    /// LRANGE key start stop
    fn cmd_lrange(&self, args: &[Bytes]) -> CommandResult {
        let [key, start, stop] = args else {
            return Err(CommandError::WrongArity("lrange"));
        };
        let start = parse_integer(start)?;
        let stop = parse_integer(stop)?;
        Ok(bulk_array(self.storage.lrange(key, start, stop)?))
    }

    // ========================================================================
    // Set commands
    // ========================================================================

    /// SADD key member [member ...]
    fn cmd_sadd(&self, args: &[Bytes]) -> CommandResult {
        let [key, members @ ..] = args else {
            return Err(CommandError::WrongArity("sadd"));
        };
        if members.is_empty() {
            return Err(CommandError::WrongArity("sadd"));
        }
        let added = self.storage.sadd(key.clone(), members.to_vec())?;
        Ok(RespValue::integer(added as i64))
    }

    /// SREM key member [member ...]
    fn cmd_srem(&self, args: &[Bytes]) -> CommandResult {
        let [key, members @ ..] = args else {
            return Err(CommandError::WrongArity("srem"));
        };
        if members.is_empty() {
            return Err(CommandError::WrongArity("srem"));
        }
        Ok(RespValue::integer(self.storage.srem(key, members)? as i64))
    }

    /// SISMEMBER key member
    fn cmd_sismember(&self, args: &[Bytes]) -> CommandResult {
        let [key, member] = args else {
            return Err(CommandError::WrongArity("sismember"));
        };
        Ok(RespValue::integer(self.storage.sismember(key, member)? as i64))
    }

    /// SMEMBERS key
    fn cmd_smembers(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("smembers"));
        };
        Ok(bulk_array(self.storage.smembers(key)?))
    }

    /// SCARD key
    fn cmd_scard(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("scard"));
        };
        Ok(RespValue::integer(self.storage.scard(key)? as i64))
    }

    // ========================================================================
    // Hash commands
    // ========================================================================

    /// HSET key field value [field value ...]
    fn cmd_hset(&self, args: &[Bytes]) -> CommandResult {
        let [key, pairs @ ..] = args else {
            return Err(CommandError::WrongArity("hset"));
        };
        if pairs.is_empty() || pairs.len() % 2 != 0 {
            return Err(CommandError::WrongArity("hset"));
        }
        let pairs = pairs
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        Ok(RespValue::integer(self.storage.hset(key.clone(), pairs)? as i64))
    }

    /// HGET key field
    fn cmd_hget(&self, args: &[Bytes]) -> CommandResult {
        let [key, field] = args else {
            return Err(CommandError::WrongArity("hget"));
        };
        Ok(bulk_or_null(self.storage.hget(key, field)?))
    }

    /// HDEL key field [field ...]
    fn cmd_hdel(&self, args: &[Bytes]) -> CommandResult {
        let [key, fields @ ..] = args else {
            return Err(CommandError::WrongArity("hdel"));
        };
        if fields.is_empty() {
            return Err(CommandError::WrongArity("hdel"));
        }
        Ok(RespValue::integer(self.storage.hdel(key, fields)? as i64))
    }

    /// HGETALL key
    fn cmd_hgetall(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("hgetall"));
        };
        let flat = self
            .storage
            .hgetall(key)?
            .into_iter()
            .flat_map(|(field, value)| [field, value])
            .collect();
        Ok(bulk_array(flat))
    }

    /// HLEN key
    fn cmd_hlen(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("hlen"));
        };
        Ok(RespValue::integer(self.storage.hlen(key)? as i64))
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Flattens a request into its name and arguments as raw bytes.
///
/// The returned vector is never empty.
fn command_args(command: RespValue) -> Result<Vec<Bytes>, CommandError> {
    let items = match command {
        RespValue::Array(items) if !items.is_empty() => items,
        _ => return Err(CommandError::InvalidFormat),
    };

    items
        .into_iter()
        .map(|item| match item {
            RespValue::BulkString(data) | RespValue::SimpleString(data) => Ok(data),
            RespValue::Integer(n) => Ok(Bytes::from(n.to_string())),
            _ => Err(CommandError::InvalidFormat),
        })
        .collect()
}

fn parse_integer(arg: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::NotAnInteger)
}

fn bulk_or_null(value: Option<Bytes>) -> RespValue {
    value
        .map(RespValue::bulk_string)
        .unwrap_or_else(RespValue::null)
}

fn bulk_array(values: Vec<Bytes>) -> RespValue {
    RespValue::array(values.into_iter().map(RespValue::bulk_string).collect())
}
