//! Entry point for `flight-client`.
//!
//! Parses CLI arguments, runs one operation against the server and prints
//! the response.  All protocol work is delegated to the library; `main.rs`
//! owns only process setup (logging, argument parsing, rendering).

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flight_client::{ClientConfig, ClientError, FlightClient, ResponseMessage};

/// Query and book flights over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Server address (host:port).
    #[arg(short, long, default_value = flight_client::config::DEFAULT_SERVER)]
    server: String,

    /// Per-attempt response timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Poll timeout in monitor mode, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,

    /// Sends per request before giving up.
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Probability of simulating loss of an outbound datagram.
    #[arg(long, default_value_t = 0.20)]
    loss_rate: f64,

    /// Seed for reproducible loss simulation.
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query flights by source and destination.
    Flights { source: String, destination: String },
    /// Query flight details by flight ID.
    Details { id: u32 },
    /// Make a seat reservation.
    Reserve { id: u32, seats: u32 },
    /// Monitor seat availability updates for a number of seconds.
    Monitor { id: u32, duration: u32 },
    /// Query points for this client's address.
    Points,
    /// Make a seat reservation paid with points.
    ReservePoints { id: u32, seats: u32 },
}

impl Cli {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            server: self.server.clone(),
            exchange_timeout: Duration::from_millis(self.timeout_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
            max_attempts: self.attempts,
            loss_rate: self.loss_rate,
            loss_seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.config();
    let mut client = FlightClient::connect(&config)
        .with_context(|| format!("cannot start session with {}", config.server))?;
    log::info!("connected to {}", config.server);

    let result = match cli.command {
        Command::Flights {
            source,
            destination,
        } => client.query_flights(&source, &destination),
        Command::Details { id } => client.flight_details(id),
        Command::Reserve { id, seats } => client.reserve_seats(id, seats),
        Command::Points => client.query_points(),
        Command::ReservePoints { id, seats } => client.reserve_seats_with_points(id, seats),
        Command::Monitor { id, duration } => {
            return monitor(&mut client, id, duration);
        }
    };

    match result {
        Ok(response) => render(&response),
        Err(ClientError::ExchangeFailed { .. }) => {
            println!("Failed to receive response after maximum retries.");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn monitor(client: &mut FlightClient, id: u32, duration: u32) -> Result<()> {
    let mut window = client.monitor_seats(id, duration)?;
    for update in window.by_ref() {
        render(&update?);
    }
    if window.updates_received() == 0 {
        println!("No response received during this period.");
    }
    println!("Monitoring duration ended.");
    Ok(())
}

fn render(response: &ResponseMessage) {
    println!("{response}");
}
