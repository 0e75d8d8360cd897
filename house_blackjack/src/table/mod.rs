//! The serialized table: one actor owns the game and every connection's
//! outbound transport.
//!
//! Transports never touch the game. They send [`TableMessage`]s through a
//! [`TableHandle`] and receive frames through their [`Transport`]. The actor
//! handles one message at a time, which makes it the only writer of the
//! session registry and round state.
//!
//! [`Transport`]: crate::net::transport::Transport
//!
//! ## Example
//!
//! ```no_run
//! use house_blackjack::table::{TableActor, TableConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, handle) = TableActor::new(TableConfig::default());
//!     tokio::spawn(actor.run());
//!
//!     let snapshot = handle.snapshot().await.unwrap();
//!     println!("{}", snapshot.game_state.status_message);
//! }
//! ```

pub mod actor;
pub mod config;
pub mod messages;

pub use actor::{TableActor, TableHandle};
pub use config::{TableConfig, TableConfigError};
pub use messages::{TableError, TableMessage};
