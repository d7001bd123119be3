//! The closed set of protocol commands the engine can put on the wire
//!
//! Each submission records one of these tags in the in-flight FIFO so that
//! replies can be matched back to the command that produced them.

use std::fmt;

/// A protocol command tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `HELLO` protocol handshake
    Hello,
    /// `PING`
    Ping,
    /// `ECHO`
    Echo,
    /// `AUTH`
    Auth,
    /// `SELECT`
    Select,
    /// `QUIT`
    Quit,
    /// `FLUSHALL`
    Flushall,
    /// `DEL`
    Del,
    /// `EXISTS`
    Exists,
    /// `EXPIRE`
    Expire,
    /// `TTL`
    Ttl,
    /// `KEYS`
    Keys,
    /// `SET`
    Set,
    /// `GET`
    Get,
    /// `APPEND`
    Append,
    /// `INCR`
    Incr,
    /// `INCRBY`
    Incrby,
    /// `DECR`
    Decr,
    /// `DECRBY`
    Decrby,
    /// `RPUSH`
    Rpush,
    /// `LPUSH`
    Lpush,
    /// `LLEN`
    Llen,
    /// `LRANGE`
    Lrange,
    /// `LTRIM`
    Ltrim,
    /// `LPOP`
    Lpop,
    /// `RPOP`
    Rpop,
    /// `HSET`
    Hset,
    /// `HGET`
    Hget,
    /// `HGETALL`
    Hgetall,
    /// `HDEL`
    Hdel,
    /// `HINCRBY`
    Hincrby,
    /// `HKEYS`
    Hkeys,
    /// `HVALS`
    Hvals,
    /// `HLEN`
    Hlen,
    /// `HMGET`
    Hmget,
    /// `ZADD`
    Zadd,
    /// `ZRANGE`
    Zrange,
    /// `ZRANGEBYSCORE`
    Zrangebyscore,
    /// `ZREMRANGEBYSCORE`
    Zremrangebyscore,
    /// `ZCARD`
    Zcard,
    /// `ZREM`
    Zrem,
    /// `ZSCORE`
    Zscore,
    /// `SADD`
    Sadd,
    /// `SMEMBERS`
    Smembers,
    /// `SREM`
    Srem,
    /// `SCARD`
    Scard,
    /// `SISMEMBER`
    Sismember,
    /// `MULTI`
    Multi,
    /// `EXEC`
    Exec,
    /// `DISCARD`
    Discard,
    /// `WATCH`
    Watch,
    /// `UNWATCH`
    Unwatch,
    /// `SUBSCRIBE`
    Subscribe,
    /// `UNSUBSCRIBE`
    Unsubscribe,
    /// `PSUBSCRIBE`
    Psubscribe,
    /// `PUNSUBSCRIBE`
    Punsubscribe,
    /// `PUBLISH`
    Publish,
}

impl Command {
    /// The command name as it appears on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hello => "HELLO",
            Self::Ping => "PING",
            Self::Echo => "ECHO",
            Self::Auth => "AUTH",
            Self::Select => "SELECT",
            Self::Quit => "QUIT",
            Self::Flushall => "FLUSHALL",
            Self::Del => "DEL",
            Self::Exists => "EXISTS",
            Self::Expire => "EXPIRE",
            Self::Ttl => "TTL",
            Self::Keys => "KEYS",
            Self::Set => "SET",
            Self::Get => "GET",
            Self::Append => "APPEND",
            Self::Incr => "INCR",
            Self::Incrby => "INCRBY",
            Self::Decr => "DECR",
            Self::Decrby => "DECRBY",
            Self::Rpush => "RPUSH",
            Self::Lpush => "LPUSH",
            Self::Llen => "LLEN",
            Self::Lrange => "LRANGE",
            Self::Ltrim => "LTRIM",
            Self::Lpop => "LPOP",
            Self::Rpop => "RPOP",
            Self::Hset => "HSET",
            Self::Hget => "HGET",
            Self::Hgetall => "HGETALL",
            Self::Hdel => "HDEL",
            Self::Hincrby => "HINCRBY",
            Self::Hkeys => "HKEYS",
            Self::Hvals => "HVALS",
            Self::Hlen => "HLEN",
            Self::Hmget => "HMGET",
            Self::Zadd => "ZADD",
            Self::Zrange => "ZRANGE",
            Self::Zrangebyscore => "ZRANGEBYSCORE",
            Self::Zremrangebyscore => "ZREMRANGEBYSCORE",
            Self::Zcard => "ZCARD",
            Self::Zrem => "ZREM",
            Self::Zscore => "ZSCORE",
            Self::Sadd => "SADD",
            Self::Smembers => "SMEMBERS",
            Self::Srem => "SREM",
            Self::Scard => "SCARD",
            Self::Sismember => "SISMEMBER",
            Self::Multi => "MULTI",
            Self::Exec => "EXEC",
            Self::Discard => "DISCARD",
            Self::Watch => "WATCH",
            Self::Unwatch => "UNWATCH",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Psubscribe => "PSUBSCRIBE",
            Self::Punsubscribe => "PUNSUBSCRIBE",
            Self::Publish => "PUBLISH",
        }
    }

    /// Whether the server acknowledges this command with a push frame
    /// instead of an ordinary reply.
    ///
    /// Subscription changes are confirmed out of band in RESP3, so these
    /// commands never enter the in-flight FIFO.
    #[must_use]
    pub const fn has_push_response(self) -> bool {
        matches!(
            self,
            Self::Subscribe | Self::Unsubscribe | Self::Psubscribe | Self::Punsubscribe
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_are_uppercase() {
        for cmd in [Command::Hello, Command::Lrange, Command::Zremrangebyscore] {
            assert!(cmd.as_str().chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_push_response_commands() {
        assert!(Command::Subscribe.has_push_response());
        assert!(Command::Punsubscribe.has_push_response());
        assert!(!Command::Publish.has_push_response());
        assert!(!Command::Get.has_push_response());
    }
}
