//! Server configuration management
//!
//! Configuration is loaded once at startup. Precedence, highest first:
//! command line flags, `HB_*` environment variables (a `.env` file is read by
//! `main` before this runs), built-in defaults.

use house_blackjack::{
    TableConfig,
    table::TableConfigError,
};
use std::{
    net::{Ipv4Addr, SocketAddr},
    str::FromStr,
};
use thiserror::Error;

/// Raw TCP listen address used when nothing else is configured.
pub const DEFAULT_TCP_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    5555,
);

/// WebSocket (and HTTP fallback) listen address used when nothing else is
/// configured.
pub const DEFAULT_WS_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    5556,
);

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Invalid table configuration: {0}")]
    Table(#[from] TableConfigError),
}

/// Values given on the command line. `None` falls through to the
/// environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub tcp_bind: Option<SocketAddr>,
    pub ws_bind: Option<SocketAddr>,
    pub min_players: Option<usize>,
}

/// Complete server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Newline-delimited JSON over raw TCP
    pub tcp_bind: SocketAddr,

    /// WebSocket upgrade plus plain HTTP fallback
    pub ws_bind: SocketAddr,

    pub table: TableConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp_bind: DEFAULT_TCP_BIND,
            ws_bind: DEFAULT_WS_BIND,
            table: TableConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Bind addresses must parse when present. Numeric settings that fail to
    /// parse fall back to their defaults.
    pub fn from_lookup<F>(lookup: F, overrides: ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = TableConfig::default();

        let tcp_bind = match overrides.tcp_bind {
            Some(addr) => addr,
            None => parse_addr(&lookup, "HB_TCP_BIND", DEFAULT_TCP_BIND)?,
        };
        let ws_bind = match overrides.ws_bind {
            Some(addr) => addr,
            None => parse_addr(&lookup, "HB_WS_BIND", DEFAULT_WS_BIND)?,
        };

        let mut table = TableConfig {
            max_chat_len: parse_or(&lookup, "HB_MAX_CHAT_LEN", defaults.max_chat_len),
            dealer_delay_ms: parse_or(&lookup, "HB_DEALER_DELAY_MS", defaults.dealer_delay_ms),
            outbound_buffer: parse_or(&lookup, "HB_OUTBOUND_BUFFER", defaults.outbound_buffer),
            handshake_timeout_secs: parse_or(
                &lookup,
                "HB_HANDSHAKE_TIMEOUT_SECS",
                defaults.handshake_timeout_secs,
            ),
            ..defaults
        };
        table.game.max_bet = parse_or(&lookup, "HB_MAX_BET", table.game.max_bet);
        table.game.start_balance = parse_or(&lookup, "HB_START_BALANCE", table.game.start_balance);
        table.game.min_players = overrides
            .min_players
            .unwrap_or_else(|| parse_or(&lookup, "HB_MIN_PLAYERS", table.game.min_players));

        Ok(Self {
            tcp_bind,
            ws_bind,
            table,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tcp_bind.port() != 0 && self.tcp_bind == self.ws_bind {
            return Err(ConfigError::Invalid {
                var: "HB_WS_BIND".to_string(),
                reason: format!("{} is already used by the TCP listener", self.ws_bind),
            });
        }

        self.table.validate()?;
        Ok(())
    }
}

fn parse_addr<F>(lookup: &F, key: &str, default: SocketAddr) -> Result<SocketAddr, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|err| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("{raw:?} is not a socket address ({err})"),
        }),
        None => Ok(default),
    }
}

/// Parse a variable or fall back to `default`
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
