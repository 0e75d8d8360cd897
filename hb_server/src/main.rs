//! Multiplayer blackjack server.
//!
//! One shared table, served over raw TCP (newline-delimited JSON) and
//! WebSocket at the same time.

use anyhow::Error;
use hb_server::{BlackjackServer, ConfigOverrides, ServerConfig, logging};
use log::{info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run a multiplayer blackjack server

USAGE:
  hb_server [OPTIONS]

OPTIONS:
  --tcp-bind     IP:PORT   Raw TCP bind address        [default: env HB_TCP_BIND or 0.0.0.0:5555]
  --ws-bind      IP:PORT   WebSocket bind address      [default: env HB_WS_BIND or 0.0.0.0:5556]
  --min-players  N         Sessions needed to deal     [default: env HB_MIN_PLAYERS or 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  HB_MAX_BET                 Largest accepted bet (default 100000)
  HB_START_BALANCE           Balance of a new session (default 100)
  HB_MAX_CHAT_LEN            Longest accepted chat message (default 500)
  HB_DEALER_DELAY_MS         Pause before each dealer draw (default 1000)
  HB_OUTBOUND_BUFFER         Frames queued per connection (default 256)
  HB_HANDSHAKE_TIMEOUT_SECS  Time a TCP client has to send its nickname (default 30)
  RUST_LOG                   Log filter (default info)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let overrides = ConfigOverrides {
        tcp_bind: pargs.opt_value_from_str("--tcp-bind")?,
        ws_bind: pargs.opt_value_from_str("--ws-bind")?,
        min_players: pargs.opt_value_from_str("--min-players")?,
    };
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("unexpected arguments: {remaining:?}");
    }

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;
    info!(
        "Table rules: max bet {}, start balance {}, min players {}",
        config.table.game.max_bet, config.table.game.start_balance, config.table.game.min_players
    );

    let server = BlackjackServer::bind(config).await?;
    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {err}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Server stopped");
    Ok(())
}
