//! Blackjack server: raw TCP and WebSocket transports in front of a single
//! [`house_blackjack::TableActor`].

pub mod api;
pub mod config;
pub mod logging;
pub mod server;
pub mod tcp;

pub use config::{ConfigError, ConfigOverrides, ServerConfig};
pub use server::{BlackjackServer, ServerError};
