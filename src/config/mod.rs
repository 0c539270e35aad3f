//! Runtime configuration read from the environment
//!
//! `.env` is loaded by the binaries before [`AppConfig::from_env`] runs.
//! Malformed numeric values fall back to their defaults with a warning.

use crate::mcp::connector::DEFAULT_CONNECT_TIMEOUT;
use crate::watch::channel::DEFAULT_KEEP_ALIVE;
use crate::watch::service::DEFAULT_POLL_INTERVAL;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FILESYSTEM_ROOT: &str = "./filesystem";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub filesystem_root: PathBuf,
    pub keep_alive: Duration,
    pub watch_poll_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            filesystem_root: PathBuf::from(DEFAULT_FILESYSTEM_ROOT),
            keep_alive: DEFAULT_KEEP_ALIVE,
            watch_poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env_parse("HOST", defaults.host),
            port: env_parse("PORT", defaults.port),
            filesystem_root: env::var("FILESYSTEM_ROOT")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.filesystem_root),
            keep_alive: env_duration("KEEP_ALIVE_SECS", Duration::from_secs, defaults.keep_alive),
            watch_poll_interval: env_duration(
                "WATCH_POLL_MS",
                Duration::from_millis,
                defaults.watch_poll_interval,
            ),
            connect_timeout: env_duration(
                "CONNECT_TIMEOUT_SECS",
                Duration::from_secs,
                defaults.connect_timeout,
            ),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "Invalid value; using default");
            default
        }),
        Err(_) => default,
    }
}

/// Zero is rejected: a zero period would spin the interval timers.
fn env_duration(key: &str, unit: fn(u64) -> Duration, default: Duration) -> Duration {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => unit(value),
            _ => {
                warn!(
                    key,
                    value = %raw,
                    default_ms = default.as_millis() as u64,
                    "Invalid duration; using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}
