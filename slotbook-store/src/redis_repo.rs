use tracing::debug;

/// INCR the window counter and start its TTL only when the window opens, so
/// traffic from a blocked client cannot keep extending its own block. The
/// `ttl < 0` arm repairs a key left without expiry.
const FIXED_WINDOW_SCRIPT: &str = r#"
    local count = redis.call("INCR", KEYS[1])
    local ttl = redis.call("TTL", KEYS[1])
    if count == 1 or ttl < 0 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
        ttl = tonumber(ARGV[1])
    end
    return {count, ttl}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Over the limit until the window closes
    Limited { retry_after_seconds: u64 },
}

/// Decide a request from the window's hit count and remaining TTL.
pub fn window_decision(count: i64, ttl_seconds: i64, limit: i64) -> RateDecision {
    if count <= limit {
        RateDecision::Allowed
    } else {
        RateDecision::Limited { retry_after_seconds: ttl_seconds.max(1) as u64 }
    }
}

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter keyed by `key`.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> redis::RedisResult<RateDecision> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count, ttl): (i64, i64) = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await?;

        debug!("Rate limit {} at {}/{}, window closes in {}s", key, count, limit, ttl);
        Ok(window_decision(count, ttl, limit))
    }
}
