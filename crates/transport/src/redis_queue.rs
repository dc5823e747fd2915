use redis::{Client, Connection, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError};
use tracing::{debug, info};

use crate::{QueueTransport, TransportError, Wait};

/// Connection parameters for the Redis broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Logical database index.
    pub db: i64,
    /// Passed through to `AUTH` untouched.
    pub password: Option<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl BrokerConfig {
    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..RedisConnectionInfo::default()
            },
        }
    }
}

/// Redis-backed queues.
///
/// A fresh connection is taken for every operation, so a broker restart
/// between commands is survived as long as it is back before the next call.
pub struct RedisQueue {
    client: Client,
}

impl RedisQueue {
    /// Validates the connection parameters and checks the broker is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] if the parameters are rejected
    /// or the first connection attempt fails.
    pub fn connect(config: &BrokerConfig) -> Result<Self, TransportError> {
        info!(
            "Attempting to connect to redis server at {}:{}/{}",
            config.host, config.port, config.db
        );
        let client = Client::open(config.connection_info()).map_err(unavailable)?;
        let queue = Self { client };
        queue.connection()?;
        Ok(queue)
    }

    fn connection(&self) -> Result<Connection, TransportError> {
        self.client.get_connection().map_err(unavailable)
    }
}

fn unavailable(err: RedisError) -> TransportError {
    TransportError::Unavailable(err.to_string())
}

fn io_failure(queue: &str, err: &RedisError) -> TransportError {
    TransportError::Io {
        queue: queue.to_string(),
        reason: err.to_string(),
    }
}

/// `BRPOP` takes whole seconds and treats zero as "block forever".
fn brpop_timeout(wait: Wait) -> u64 {
    match wait {
        Wait::Forever => 0,
        Wait::Timeout(d) => d.as_secs().max(1),
    }
}

impl QueueTransport for RedisQueue {
    fn receive(&mut self, queue: &str, wait: Wait) -> Result<Option<Vec<u8>>, TransportError> {
        let mut con = self.connection()?;
        let popped: Option<(String, Vec<u8>)> = redis::cmd("BRPOP")
            .arg(queue)
            .arg(brpop_timeout(wait))
            .query(&mut con)
            .map_err(|e| io_failure(queue, &e))?;

        Ok(popped.map(|(_, bytes)| {
            debug!(queue, bytes = bytes.len(), "popped message");
            bytes
        }))
    }

    fn send(&mut self, queue: &str, message: &str) -> Result<(), TransportError> {
        let mut con = self.connection()?;
        redis::cmd("RPUSH")
            .arg(queue)
            .arg(message)
            .query::<()>(&mut con)
            .map_err(|e| io_failure(queue, &e))?;
        debug!(queue, bytes = message.len(), "pushed message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn forever_maps_to_zero_seconds() {
        assert_eq!(brpop_timeout(Wait::Forever), 0);
    }

    #[test]
    fn sub_second_timeout_is_rounded_up() {
        assert_eq!(brpop_timeout(Wait::Timeout(Duration::from_millis(200))), 1);
        assert_eq!(brpop_timeout(Wait::Timeout(Duration::from_secs(5))), 5);
    }

    #[test]
    fn default_broker_is_local() {
        let config = BrokerConfig::default();
        let info = config.connection_info();
        assert_eq!(info.addr, ConnectionAddr::Tcp("127.0.0.1".to_string(), 6379));
        assert_eq!(info.redis.db, 0);
        assert!(info.redis.password.is_none());
    }
}
