//! EmberKV CLI - line-mode client
//!
//! Reads commands from stdin one line at a time, sends each as an array of
//! bulk strings and prints the reply the way redis-cli does. Typing `quit`
//! (any case) sends `QUIT` and exits.

use anyhow::Context;
use emberkv::config::{ClientConfig, ConfigAction};
use emberkv::protocol::{RespReader, RespValue, RespWriter};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
EmberKV CLI - line-mode client

USAGE:
    emberkv-cli [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Server host (default: localhost)
    -p, --port <PORT>    Server port (default: 6379)
    -v, --version        Print version information
        --help           Print this help message

Each input line is split on whitespace and sent as one command.
Command names are case-sensitive: type PING, not ping.
"#
    );
}

fn prompt(address: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}> ", address)?;
    stdout.flush()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match ClientConfig::from_args(std::env::args().skip(1)) {
        Ok(ConfigAction::Run(config)) => config,
        Ok(ConfigAction::Help) => {
            print_help();
            return Ok(());
        }
        Ok(ConfigAction::Version) => {
            println!("emberkv-cli version {}", emberkv::VERSION);
            return Ok(());
        }
        Err(e) => {
            print_help();
            return Err(e.into());
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let address = config.server_address();
    let stream = TcpStream::connect(&address)
        .await
        .with_context(|| format!("could not connect to {}", address))?;
    debug!(server = %address, "Connected");

    let (read_half, write_half) = stream.into_split();
    let mut reader = RespReader::new(read_half);
    let mut writer = RespWriter::new(write_half);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt(&address)?;
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            prompt(&address)?;
            continue;
        }

        let quitting = parts[0].eq_ignore_ascii_case("quit");
        let request = if quitting {
            RespValue::command(["QUIT"])
        } else {
            RespValue::command(parts.iter().map(|p| p.to_string()))
        };

        writer.write(&request).await?;

        match reader.read().await? {
            Some(reply) => println!("{}", reply),
            None => {
                println!("Server closed the connection");
                break;
            }
        }

        if quitting {
            break;
        }
        prompt(&address)?;
    }

    Ok(())
}
