//! Lua scripts for atomic identity writes.
//!
//! Each identity is a redis HASH with fields `browser_id`, `username`,
//! `color` and `created_at`. Writes run server-side so that:
//! - a full overwrite never leaves a merged record behind
//! - the conditional create checks and writes in one step
//! - `created_at` comes from the redis clock, not the caller's
//!
//! `TIME` is non-deterministic, so each script switches to effects
//! replication before writing. Redis 5+ always replicates effects and treats
//! `redis.replicate_commands()` as a no-op; on 3.2 and 4 the call is required.

/// Lua script for a full-overwrite write.
///
/// Arguments:
/// - KEYS[1]: Identity key (e.g., `zero-auth:{browser_id}`)
/// - ARGV[1]: browser_id
/// - ARGV[2]: username
/// - ARGV[3]: color
///
/// Returns:
/// - created_at in epoch milliseconds
pub const SET_IDENTITY: &str = r#"
redis.replicate_commands()
local now = redis.call('TIME')
local created_at = tonumber(now[1]) * 1000 + math.floor(tonumber(now[2]) / 1000)

redis.call('DEL', KEYS[1])
redis.call('HSET', KEYS[1],
    'browser_id', ARGV[1],
    'username', ARGV[2],
    'color', ARGV[3],
    'created_at', string.format('%d', created_at))
return created_at
"#;

/// Lua script for a create-if-absent write.
///
/// Arguments:
/// - KEYS[1]: Identity key (e.g., `zero-auth:{browser_id}`)
/// - ARGV[1]: browser_id
/// - ARGV[2]: username
/// - ARGV[3]: color
///
/// Returns:
/// - created_at in epoch milliseconds when the record was written
/// - -1 when a document already exists (nothing written)
pub const CREATE_IDENTITY_IF_ABSENT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return -1
end

redis.replicate_commands()
local now = redis.call('TIME')
local created_at = tonumber(now[1]) * 1000 + math.floor(tonumber(now[2]) / 1000)

redis.call('HSET', KEYS[1],
    'browser_id', ARGV[1],
    'username', ARGV[2],
    'color', ARGV[3],
    'created_at', string.format('%d', created_at))
return created_at
"#;
