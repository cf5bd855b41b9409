//! `slots` CLI: propose free meeting slots from a calendar.
//!
//! ## Usage
//!
//! ```sh
//! # Two slots from an exported calendar, German labels
//! slots find -i calendar.ics
//!
//! # Read the calendar from stdin, English labels, JSON output
//! cat calendar.ics | slots find -i - --lang en --json
//!
//! # Combine a calendar with a free/busy answer, reproducible "now"
//! slots find -i calendar.ics --freebusy busy.json --now 2025-01-06T08:00
//!
//! # Mark days already spent near the pickup location
//! slots find -i calendar.ics --near "04109 Leipzig"
//!
//! # Show the merged busy intervals the search works with
//! slots busy -i calendar.ics --days 3
//!
//! # Write the proposals as meetings into a new calendar file
//! slots export -i calendar.ics --title "Sofa" --seller Jonas -o meetings.ics
//! ```
//!
//! Settings can be kept in a TOML file (`-c slots.toml`); flags override it.
//! Log verbosity follows `RUST_LOG` (default `warn`); logs go to stderr.

use std::io::{self, ErrorKind, Read};

use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use slot_engine::config::parse_timezone;
use slot_engine::finder::horizon_end;
use slot_engine::freebusy::parse_timestamp;
use slot_engine::{
    extended_horizon_days, find_free_slots_in_busy, format_slot, highlight_dates,
    merge_busy_intervals, normalize_events, parse_calendar, parse_freebusy, slots_to_ics,
    BusyInterval, CalendarEvent, Clock, FixedClock, FreeSlot, Language, MeetingDetails,
    SlotConfig, SlotSettings, SystemClock,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Propose free meeting slots from an iCalendar file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find free slots and print them
    Find {
        #[command(flatten)]
        search: SearchArgs,
        /// Ad location, e.g. "04109 Leipzig"; days spent there are marked
        #[arg(long)]
        near: Option<String>,
        /// Label language: de or en
        #[arg(long, default_value = "de")]
        lang: String,
        /// Print slots as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the merged busy intervals inside the search window
    Busy {
        #[command(flatten)]
        search: SearchArgs,
        /// Print intervals as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write found slots as iCalendar meeting events
    Export {
        #[command(flatten)]
        search: SearchArgs,
        /// Listing title used in the event summary
        #[arg(long)]
        title: String,
        /// Seller name used in the event summary
        #[arg(long)]
        seller: Option<String>,
        /// Meeting location
        #[arg(long)]
        location: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Inputs and settings shared by every subcommand.
#[derive(Args)]
struct SearchArgs {
    /// iCalendar file ("-" reads stdin); a missing file counts as an empty calendar
    #[arg(short, long)]
    input: Option<String>,
    /// Free/busy JSON file
    #[arg(long)]
    freebusy: Option<String>,
    /// TOML settings file
    #[arg(short, long)]
    config: Option<String>,
    /// Search start, RFC 3339 or YYYY-MM-DDTHH:MM in the configured zone
    #[arg(long)]
    now: Option<String>,
    /// Search horizon in days
    #[arg(long)]
    days: Option<u32>,
    /// Slot length in minutes
    #[arg(long)]
    duration: Option<i64>,
    /// Maximum number of slots
    #[arg(long)]
    max: Option<usize>,
    /// Gap around busy time and between slots, in minutes
    #[arg(long)]
    buffer: Option<i64>,
    /// IANA time zone, e.g. Europe/Berlin
    #[arg(long)]
    timezone: Option<String>,
}

/// Everything a subcommand needs after reading its inputs.
struct Search {
    config: SlotConfig,
    now: DateTime<Tz>,
    events: Vec<CalendarEvent>,
    external_busy: Vec<BusyInterval>,
}

impl Search {
    /// Everything the sweep has to avoid: calendar events and free/busy data.
    fn all_busy(&self) -> Vec<BusyInterval> {
        let mut busy = normalize_events(&self.events, self.now, &self.config);
        busy.extend_from_slice(&self.external_busy);
        busy
    }

    /// Merged busy intervals that overlap the search window.
    fn busy_in_window(&self) -> Result<Vec<BusyInterval>> {
        let window_end = horizon_end(self.now, &self.config)
            .ok_or_else(|| anyhow!("Search window exceeds the supported date range"))?;
        Ok(merge_busy_intervals(self.all_busy())
            .into_iter()
            .filter(|b| b.end >= self.now && b.start <= window_end)
            .collect())
    }

    fn slots(&self) -> Result<Vec<FreeSlot>> {
        find_free_slots_in_busy(&self.all_busy(), &self.now, &self.config)
            .context("Failed to search for free slots")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Find {
            search,
            near,
            lang,
            json,
        } => {
            let language = Language::from_code(&lang)
                .ok_or_else(|| anyhow!("Unknown language: '{}'. Use de or en", lang))?;
            let mut search = prepare(&search)?;

            let highlights = match near.as_deref() {
                Some(location) => highlight_dates(&search.events, location),
                None => Vec::new(),
            };
            search.config.horizon_days = extended_horizon_days(
                search.now.date_naive(),
                search.config.horizon_days,
                &highlights,
            );

            let slots = search.slots()?;
            if json {
                let entries: Vec<_> = slots
                    .iter()
                    .map(|slot| {
                        let highlighted = highlights.contains(&slot.start.date_naive());
                        json!({
                            "start": slot.start.to_rfc3339(),
                            "end": slot.end.to_rfc3339(),
                            "label": format_slot(slot, language, highlighted),
                            "highlighted": highlighted,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if slots.is_empty() {
                println!("{}", language.no_availability());
            } else {
                for slot in &slots {
                    let highlighted = highlights.contains(&slot.start.date_naive());
                    println!("{}", format_slot(slot, language, highlighted));
                }
            }
        }
        Commands::Busy { search, json } => {
            let search = prepare(&search)?;
            let busy = search.busy_in_window()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&busy)?);
            } else {
                for interval in &busy {
                    println!(
                        "{} - {}",
                        interval.start.format("%Y-%m-%d %H:%M"),
                        interval.end.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        Commands::Export {
            search,
            title,
            seller,
            location,
            output,
        } => {
            let search = prepare(&search)?;
            let slots = search.slots()?;
            if slots.is_empty() {
                eprintln!("{}", Language::default().no_availability());
            }
            let details = MeetingDetails {
                title,
                seller,
                location,
            };
            let ics = slots_to_ics(&slots, &details, search.now.to_utc());
            write_output(output.as_deref(), &ics)?;
        }
    }

    Ok(())
}

/// Resolve settings and read every input named on the command line.
fn prepare(args: &SearchArgs) -> Result<Search> {
    let config = load_config(args)?;
    let tz = config.timezone;

    let clock: Box<dyn Clock> = match args.now.as_deref() {
        Some(value) => {
            let now = parse_timestamp(value, tz)
                .ok_or_else(|| anyhow!("Invalid --now timestamp: '{}'", value))?;
            Box::new(FixedClock(now.to_utc()))
        }
        None => Box::new(SystemClock),
    };
    let now = clock.now().with_timezone(&tz);

    let events = match args.input.as_deref() {
        Some(path) => read_calendar(path)?,
        None => Vec::new(),
    };
    let external_busy = match args.freebusy.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path))?;
            parse_freebusy(&text, tz)
                .with_context(|| format!("Failed to read free/busy data from {}", path))?
        }
        None => Vec::new(),
    };

    info!(%now, events = events.len(), busy = external_busy.len(), "inputs loaded");
    Ok(Search {
        config,
        now,
        events,
        external_busy,
    })
}

/// Settings file first, then command-line overrides, then validation.
fn load_config(args: &SearchArgs) -> Result<SlotConfig> {
    let mut settings = match args.config.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path))?;
            SlotSettings::from_toml_str(&text)
                .with_context(|| format!("Invalid settings file: {}", path))?
        }
        None => SlotSettings::default(),
    };

    if let Some(name) = args.timezone.as_deref() {
        parse_timezone(name).context("Invalid --timezone")?;
        settings.timezone = Some(name.to_string());
    }
    settings.horizon_days = args.days.or(settings.horizon_days);
    settings.slot_minutes = args.duration.or(settings.slot_minutes);
    settings.max_slots = args.max.or(settings.max_slots);
    settings.buffer_minutes = args.buffer.or(settings.buffer_minutes);

    SlotConfig::try_from(settings).context("Invalid configuration")
}

/// Read an iCalendar file. A missing file is an empty calendar.
fn read_calendar(path: &str) -> Result<Vec<CalendarEvent>> {
    let text = if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    } else {
        match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path, "calendar file not found, assuming an empty calendar");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read file: {}", path));
            }
        }
    };

    let parsed = parse_calendar(&text);
    if parsed.skipped > 0 {
        warn!(path, skipped = parsed.skipped, "some calendar events could not be read");
    }
    Ok(parsed.events)
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
