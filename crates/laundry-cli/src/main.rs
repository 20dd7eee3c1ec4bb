//! `laundry` CLI — book the shared washer and dryer from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Register a tenant
//! laundry register --user 1
//!
//! # Book an explicit interval
//! laundry book --user 1 --resource washer \
//!     --start 2026-03-02T10:00:00Z --end 2026-03-02T12:00:00Z --note "whites"
//!
//! # Book the next free two-hour slot
//! laundry next --user 1 --resource dryer --duration 120
//!
//! # Cancel your own booking
//! laundry cancel --user 1 --id 3
//!
//! # Show bookings (all, today's, this week's, or one user's)
//! laundry list --week
//!
//! # Show free time on a day
//! laundry free --resource washer --date 2026-03-02
//!
//! # Block a user for a week, or permanently
//! laundry block --user 2 --until 2026-03-09T00:00:00Z
//! laundry block --user 2
//! ```
//!
//! State lives in a JSON ledger (`--ledger`, default `laundry.json`). `--now`
//! pins the clock; `--config` points at a TOML engine config.

mod ledger;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use laundry_engine::{
    AccessRegistry, BookingRequest, BookingService, EngineConfig, FixedClock, InMemoryStore,
    NextAvailableRequest, Reservation, ReservationId, Resource, UserId,
};
use serde::Serialize;

use crate::ledger::Ledger;

type Service = BookingService<InMemoryStore, AccessRegistry, FixedClock>;

#[derive(Parser)]
#[command(
    name = "laundry",
    version,
    about = "Book the shared washer and dryer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ledger file holding users and reservations
    #[arg(long, global = true, default_value = "laundry.json")]
    ledger: PathBuf,

    /// Engine config (TOML). Defaults apply when omitted.
    #[arg(long, global = true, env = "LAUNDRY_CONFIG")]
    config: Option<PathBuf>,

    /// Treat this RFC 3339 instant as the current time
    #[arg(long, global = true, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a user to the ledger
    Register {
        #[arg(long)]
        user: u64,
    },
    /// Book an explicit interval
    Book {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        resource: Resource,
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_instant)]
        end: DateTime<Utc>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Book the next free slot of the given length
    Next {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        resource: Resource,
        /// Slot length in minutes
        #[arg(long, default_value_t = 120)]
        duration: i64,
        #[arg(long)]
        note: Option<String>,
    },
    /// Cancel one of your bookings
    Cancel {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        id: u64,
    },
    /// List bookings
    List {
        /// Only bookings owned by this user
        #[arg(long, conflicts_with_all = ["today", "week"])]
        user: Option<u64>,
        /// Only bookings starting between now and midnight
        #[arg(long, conflicts_with = "week")]
        today: bool,
        /// Only bookings starting in the seven days from today
        #[arg(long)]
        week: bool,
    },
    /// Report whether an interval on a machine is free
    Check {
        #[arg(long)]
        resource: Resource,
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_instant)]
        end: DateTime<Utc>,
    },
    /// Show free windows on a local date
    Free {
        #[arg(long)]
        resource: Resource,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Block a user until an instant, or permanently
    Block {
        #[arg(long)]
        user: u64,
        #[arg(long, value_parser = parse_instant)]
        until: Option<DateTime<Utc>>,
    },
    /// Lift a user's block
    Unblock {
        #[arg(long)]
        user: u64,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let (store, registry) = Ledger::load(&cli.ledger)?.into_parts()?;
    let now = cli.now.unwrap_or_else(Utc::now);
    let service = BookingService::with_clock(store, registry, FixedClock(now), config)
        .context("Invalid engine configuration")?;

    if run(&service, cli.command)? {
        let (store, registry) = service.into_parts();
        Ledger::from_parts(&store, &registry).save(&cli.ledger)?;
    }
    Ok(())
}

/// Execute one command. Returns true when the ledger changed.
fn run(service: &Service, command: Commands) -> Result<bool> {
    match command {
        Commands::Register { user } => {
            service.access().register(UserId(user));
            println!("Registered user {}", user);
            Ok(true)
        }
        Commands::Book {
            user,
            resource,
            start,
            end,
            note,
        } => {
            let reservation = service
                .create_booking(BookingRequest {
                    user: UserId(user),
                    resource,
                    start,
                    end,
                    note,
                })
                .context("Failed to book")?;
            print_json(&reservation)?;
            Ok(true)
        }
        Commands::Next {
            user,
            resource,
            duration,
            note,
        } => {
            let reservation = service
                .book_next_available(NextAvailableRequest {
                    user: UserId(user),
                    resource,
                    duration_minutes: duration,
                    note,
                })
                .context("Failed to find available slot")?;
            print_json(&reservation)?;
            Ok(true)
        }
        Commands::Cancel { user, id } => {
            service
                .delete_booking(ReservationId(id), UserId(user))
                .context("Failed to cancel")?;
            println!("Cancelled booking {}", id);
            Ok(true)
        }
        Commands::List { user, today, week } => {
            let bookings: Vec<Reservation> = match (user, today, week) {
                (Some(user), _, _) => service.user_bookings(UserId(user))?,
                (None, true, _) => service.today_bookings()?,
                (None, false, true) => service.week_bookings()?,
                (None, false, false) => service.store().snapshot(),
            };
            print_json(&bookings)?;
            Ok(false)
        }
        Commands::Check {
            resource,
            start,
            end,
        } => {
            if service.has_conflict(resource, start, end)? {
                println!("conflict");
            } else {
                println!("free");
            }
            Ok(false)
        }
        Commands::Free { resource, date } => {
            let windows = service.free_windows(resource, date)?;
            print_json(&windows)?;
            Ok(false)
        }
        Commands::Block { user, until } => {
            service.access().block(UserId(user), until)?;
            match until {
                Some(until) => println!("Blocked user {} until {}", user, until.to_rfc3339()),
                None => println!("Blocked user {} permanently", user),
            }
            Ok(true)
        }
        Commands::Unblock { user } => {
            service.access().unblock(UserId(user))?;
            println!("Unblocked user {}", user);
            Ok(true)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let config = EngineConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 instant like 2026-03-02T10:00:00Z: {}", e))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
