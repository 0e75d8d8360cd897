//! A terminal client for the blackjack server.
//!
//! Connects over raw TCP, answers the nickname request, prints every table
//! update and turns typed commands into protocol messages.

use anyhow::{Context, Result};
use hb_client::{
    commands::{Command, HELP_TEXT, parse_command},
    display::render_message,
};
use house_blackjack::{
    functional::sanitize_nickname,
    messages::ServerMessage,
    utils::{MAX_LINE_LEN, read_line, write_line},
};
use pico_args::Arguments;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::{TcpStream, tcp::OwnedReadHalf},
    sync::mpsc,
};

const HELP: &str = "\
Connect to a blackjack server

USAGE:
  hb_client [OPTIONS]

OPTIONS:
  --server IP:PORT      Server TCP address  [default: 127.0.0.1:5555]
  --nickname NAME       Nickname at the table  [default: your user name]

FLAGS:
  -h, --help            Print help information
";

struct Args {
    server: String,
    nickname: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let args = Args {
        server: pargs
            .opt_value_from_str("--server")?
            .unwrap_or_else(|| "127.0.0.1:5555".to_string()),
        nickname: pargs
            .opt_value_from_str("--nickname")?
            .unwrap_or_else(whoami::username),
    };

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let stream = TcpStream::connect(&args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    let (reader, mut writer) = stream.into_split();
    println!("Connected to {}. Type 'help' for commands.", args.server);

    let me = sanitize_nickname(&args.nickname);
    let (tx, mut inbox) = mpsc::channel(64);
    let reader_task = tokio::spawn(read_server(reader, tx));
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            message = inbox.recv() => match message {
                Some(ServerMessage::NickRequest { .. }) => {
                    write_line(&mut writer, &args.nickname).await?;
                }
                Some(message) => {
                    if let Some(text) = render_message(&message, &me) {
                        println!("{text}");
                    }
                }
                None => {
                    println!("Disconnected.");
                    break;
                }
            },
            input = stdin.next_line() => match input? {
                None => break,
                Some(input) if input.trim().is_empty() => {}
                Some(input) => match parse_command(&input) {
                    Ok(Command::Send(message)) => {
                        write_line(&mut writer, &serde_json::to_string(&message)?).await?;
                    }
                    Ok(Command::Help) => println!("{HELP_TEXT}"),
                    Ok(Command::Quit) => break,
                    Err(err) => println!("{err}"),
                },
            },
        }
    }

    reader_task.abort();
    Ok(())
}

/// Forward every server line as a parsed message until the connection ends.
async fn read_server(reader: OwnedReadHalf, tx: mpsc::Sender<ServerMessage>) {
    let mut reader = BufReader::new(reader);
    loop {
        match read_line(&mut reader, MAX_LINE_LEN).await {
            Ok(Some(line)) => match ServerMessage::parse(&line) {
                Ok(message) => {
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
                Err(err) => eprintln!("? unreadable message from server: {err}"),
            },
            Ok(None) => break,
            Err(err) if err.is_fatal() => {
                eprintln!("? connection error: {err}");
                break;
            }
            Err(err) => eprintln!("? {err}"),
        }
    }
}
