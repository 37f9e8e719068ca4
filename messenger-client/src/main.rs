//! Entry point for `messenger-client`.
//!
//! Parses CLI arguments and dispatches into a one-shot fetch or post, the
//! interactive chat loop, or the simulated board server.  All protocol work
//! is delegated to library modules; `main.rs` owns only process setup
//! (logging, argument parsing) and terminal output.

use std::io::Write;
use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use messenger_client::client::{BoardClient, BoardUpdate, POLL_INTERVAL};
use messenger_client::config::{self, ClientConfig, RetryPolicy};
use messenger_client::simulator::{SimServer, SimulatorConfig};

/// Message board client speaking a stop-and-wait protocol over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Args)]
struct ServerArgs {
    /// Host name of the board server.
    #[arg(long, global = true, default_value = config::DEFAULT_HOST)]
    host: String,
    /// Port of the board server.
    #[arg(long, global = true, default_value_t = config::DEFAULT_PORT)]
    port: u16,
    /// Transmissions per request before giving up.
    #[arg(long, global = true, default_value_t = config::DEFAULT_RETRIES)]
    retries: u32,
    /// Seconds to wait for each reply (retransmission timeout).
    #[arg(long, global = true, default_value_t = 0.1)]
    timeout: f64,
    /// User name to post under; prompted for when omitted.
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Mode {
    /// Fetch and print every message on the board.
    Fetch,
    /// Post one message.
    Post {
        /// Message text.
        text: String,
    },
    /// Poll the board every second and post each line read from stdin.
    Chat,
    /// Run a simulated board server.
    Serve {
        /// Local address to bind.
        #[arg(short, long, default_value = "127.0.0.1:1111")]
        bind: SocketAddr,
        /// Probability of silently dropping a request.
        #[arg(long, default_value_t = 0.0)]
        loss: f64,
        /// Seed for the loss RNG.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

impl ServerArgs {
    fn to_config(&self) -> Result<ClientConfig> {
        let config = ClientConfig {
            host: self.host.clone(),
            port: self.port,
            retry: RetryPolicy {
                retries: self.retries,
                timeout: config::timeout_from_secs(self.timeout)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn user_name(&self) -> Result<String> {
        if let Some(user) = &self.user {
            return Ok(user.clone());
        }
        print!("What is your user name (max 8 characters)? ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("reading user name")?;
        let user = line.trim().to_string();
        if user.is_empty() {
            bail!("a user name is required");
        }
        Ok(user)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Fetch => {
            let config = cli.server.to_config()?;
            let user = cli.server.user.clone().unwrap_or_default();
            let mut client = BoardClient::connect(user, &config).await?;
            show(&client.fetch().await);
        }
        Mode::Post { text } => {
            let config = cli.server.to_config()?;
            let mut client = BoardClient::connect(cli.server.user_name()?, &config).await?;
            match client.post(&text).await {
                Some(update) => show(&update),
                None => bail!("refusing to post an empty message"),
            }
        }
        Mode::Chat => {
            let config = cli.server.to_config()?;
            let client = BoardClient::connect(cli.server.user_name()?, &config).await?;
            chat(client).await?;
        }
        Mode::Serve { bind, loss, seed } => {
            let server = SimServer::spawn(
                bind,
                SimulatorConfig {
                    loss_rate: loss,
                    seed,
                },
            )
            .await?;
            log::info!("Serving simulated board on {}", server.local_addr);
            tokio::signal::ctrl_c().await?;
            server.shutdown().await;
        }
    }
    Ok(())
}

/// One event loop for both the poll timer and user input, so only one
/// request is ever outstanding.
async fn chat(mut client: BoardClient) -> Result<()> {
    let mut ticker = interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    log::info!("chatting as {}", client.user());
    loop {
        tokio::select! {
            _ = ticker.tick() => show(&client.fetch().await),
            line = lines.next_line() => match line? {
                Some(text) => {
                    if let Some(update) = client.post(text.trim_end()).await {
                        show(&update);
                    }
                }
                None => break,
            },
        }
    }
    let stats = client.stats();
    log::info!(
        "done: {} request(s), {} transmission(s), {} unresponsive",
        stats.requests,
        stats.transmissions,
        stats.unresponsive
    );
    Ok(())
}

fn show(update: &BoardUpdate) {
    if let Some(messages) = &update.messages {
        for line in messages {
            println!("{line}");
        }
    }
    println!("-- {}", update.status);
}
