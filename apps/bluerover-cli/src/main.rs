mod config;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bluerover_client::BlueRoverClient;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, IdlePolicyName, Overrides, StreamOverrides};

#[derive(Debug, Parser)]
#[command(name = "bluerover", version, about = "Command-line client for the BlueRover API")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "BLUEROVER_CONFIG")]
    config: Option<PathBuf>,

    /// HMAC secret key
    #[arg(long, global = true)]
    key: Option<String>,

    #[arg(long, global = true)]
    token: Option<String>,

    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    connect_timeout: Option<Duration>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Signed GET of PATH; prints the response body
    Call {
        /// Path relative to the base URL, e.g. `/devices`
        path: String,

        /// Query parameter, repeatable
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Follow the event stream, writing every chunk to stdout until Ctrl-C
    Stream {
        /// Stream path relative to the base URL [default: /eventstream]
        #[arg(long)]
        path: Option<String>,

        #[arg(long, value_parser = humantime::parse_duration)]
        idle_timeout: Option<Duration>,

        #[arg(long, value_enum)]
        idle_policy: Option<IdlePolicyName>,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let stream = match &self.command {
            Command::Stream {
                path,
                idle_timeout,
                idle_policy,
            } => StreamOverrides {
                path: path.clone(),
                idle_timeout: idle_timeout.map(format_duration),
                idle_policy: *idle_policy,
            },
            Command::Call { .. } => StreamOverrides::default(),
        };

        Overrides {
            key: self.key.clone(),
            token: self.token.clone(),
            base_url: self.base_url.clone(),
            connect_timeout: self.connect_timeout.map(format_duration),
            stream,
        }
    }
}

fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in {raw:?}"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries response data; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), &cli.overrides())?;
    let client = BlueRoverClient::from_config(config.client_config()?)?;

    match cli.command {
        Command::Call { path, params } => {
            let body = client.call(&path, params).await?;
            println!("{body}");
        }
        Command::Stream { .. } => {
            let stream_config = config.stream_config()?;
            tracing::info!(path = %stream_config.relative_path, "Following stream, press Ctrl-C to stop");

            let handle = client.stream_with_config(|chunk: Bytes| write_chunk(&chunk), stream_config)?;
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;

            tracing::info!("Stopping stream");
            handle.stop().await;
        }
    }

    Ok(())
}

fn write_chunk(chunk: &[u8]) {
    let mut stdout = std::io::stdout().lock();
    if let Err(err) = stdout.write_all(chunk).and_then(|()| stdout.flush()) {
        tracing::warn!(error = %err, "Failed to write chunk to stdout");
    }
}
