//! `lessons` CLI: query and update a lesson schedule kept in a JSON file.
//!
//! ## Usage
//!
//! ```sh
//! # Is the slot free for student 1 with instructor 2?
//! lessons -d school.json check --student 1 --instructor 2 --date 2025-03-10 --start 09:00 --end 10:00
//!
//! # Which vehicle would instructor 2 get?
//! lessons -d school.json resolve-vehicle --instructor 2
//!
//! # Instructor 2's calendar, without one hidden event
//! lessons -d school.json project --scope instructor:2 --hide schedule_4
//!
//! # Move a lesson and write the result back
//! lessons -d school.json --now 2025-03-10T08:00 relocate --event schedule_3 \
//!     --date 2025-03-11 --start 14:00 --end 15:00 --apply
//!
//! # Cancel a lesson
//! lessons -d school.json status --session 3 --to cancelled --reason "car in repair" --apply
//!
//! # Book from a request file
//! lessons -d school.json book --request booking.json --apply
//!
//! # Completed hours and a double-booking audit
//! lessons -d school.json hours --student 1
//! lessons -d school.json audit
//! ```
//!
//! Results are printed to stdout as JSON. A rejected request (conflict, move
//! into the past, double bookings found) exits with status 2; usage and I/O
//! failures exit with status 1.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use lesson_engine::{
    book_session, check_availability, completed_hours, find_double_bookings, project,
    relocate_session, request_status_change, resolve_vehicle, validate_event_relocation,
    BookingRequest, Candidate, EngineConfig, EngineError, EventId, ExamSource, InMemoryStore,
    InstructorId, SessionId, SessionStatus, StoreSnapshot, StudentId, VehicleId, ViewerScope,
};
use serde::Serialize;

const EXIT_REJECTED: i32 = 2;

#[derive(Parser)]
#[command(
    name = "lessons",
    version,
    about = "Driving-lesson scheduling and availability engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Schedule data file: {"sessions": [...], "exams": [...], "vehicles": [...]}
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference time, e.g. 2025-03-10T08:00 (defaults to the local clock)
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    /// Raise log verbosity (-v debug, -vv trace); logs go to stderr
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a slot is free for the given resources
    Check {
        #[arg(long)]
        student: Option<u64>,
        #[arg(long)]
        instructor: Option<u64>,
        #[arg(long)]
        vehicle: Option<u64>,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,
        /// Session being edited, ignored during the check
        #[arg(long)]
        exclude: Option<u64>,
    },
    /// Show which vehicle an instructor's lessons would use
    ResolveVehicle {
        #[arg(long)]
        instructor: u64,
    },
    /// Project sessions and exams into calendar events
    Project {
        /// admin, instructor:<id> or student:<id>
        #[arg(long, default_value = "admin")]
        scope: ViewerScope,
        /// First date to include
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date to include
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Comma-separated event ids to hide, e.g. schedule_3,exam_1
        #[arg(long, value_delimiter = ',')]
        hide: Vec<EventId>,
    },
    /// Validate moving or resizing an event
    Relocate {
        /// Event id, e.g. schedule_3
        #[arg(long)]
        event: EventId,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,
        /// Write the move back to the data file when accepted
        #[arg(long)]
        apply: bool,
    },
    /// Change a session's status
    Status {
        #[arg(long)]
        session: u64,
        /// in_progress, completed, cancelled or no_show
        #[arg(long)]
        to: SessionStatus,
        /// Cancellation reason
        #[arg(long)]
        reason: Option<String>,
        /// Write the change back to the data file
        #[arg(long)]
        apply: bool,
    },
    /// Book a new session from a JSON request file
    Book {
        #[arg(long)]
        request: PathBuf,
        /// Write the new session back to the data file
        #[arg(long)]
        apply: bool,
    },
    /// Completed theory and practical hours for a student
    Hours {
        #[arg(long)]
        student: u64,
    },
    /// List double bookings already present in the data file
    Audit,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data_path = cli
        .data
        .as_deref()
        .context("No data file given. Pass --data <FILE>")?;
    let store = load_store(data_path)?;
    let config = load_config(cli.config.as_deref())?;
    let now = cli.now.unwrap_or_else(|| Local::now().naive_local());
    tracing::debug!(%now, data = %data_path.display(), "loaded schedule");

    match cli.command {
        Commands::Check {
            student,
            instructor,
            vehicle,
            date,
            start,
            end,
            exclude,
        } => {
            let candidate = Candidate {
                student: student.map(StudentId),
                instructor: instructor.map(InstructorId),
                vehicle: vehicle.map(VehicleId),
                date,
                start_time: start,
                end_time: end,
                exclude: exclude.map(SessionId),
            };
            let result = check_availability(&store, &candidate)
                .context("Failed to check availability")?;
            print_json(&result)?;
            if !result.available {
                process::exit(EXIT_REJECTED);
            }
        }
        Commands::ResolveVehicle { instructor } => {
            let resolution = resolve_vehicle(&store, InstructorId(instructor))
                .context("Failed to resolve vehicle")?;
            print_json(&resolution)?;
        }
        Commands::Project {
            scope,
            from,
            to,
            hide,
        } => {
            let from = from.unwrap_or(NaiveDate::MIN);
            let to = to.unwrap_or(NaiveDate::MAX);
            let sessions: Vec<_> = store
                .all_sessions()
                .into_iter()
                .filter(|s| from <= s.date && s.date <= to)
                .collect();
            let exams = store
                .find_exams_for_viewer(scope, from, to)
                .context("Failed to load exams")?;
            let hidden: HashSet<EventId> = hide.into_iter().collect();
            let events = project(scope, &sessions, &exams, &hidden, &config);
            print_json(&events)?;
        }
        Commands::Relocate {
            event,
            date,
            start,
            end,
            apply,
        } => {
            let decision = validate_event_relocation(&store, event, date, start, end, now)
                .with_context(|| format!("Failed to validate relocation of {}", event))?;
            print_json(&decision)?;
            if !decision.is_ok() {
                process::exit(EXIT_REJECTED);
            }
            if apply {
                if let EventId::Session(id) = event {
                    relocate_session(&store, id, date, start, end, now)
                        .with_context(|| format!("Failed to relocate {}", event))?;
                    save_store(data_path, &store)?;
                }
            }
        }
        Commands::Status {
            session,
            to,
            reason,
            apply,
        } => {
            let updated =
                request_status_change(&store, SessionId(session), to, reason.as_deref(), now)
                    .with_context(|| format!("Failed to change status of session {}", session))?;
            print_json(&updated)?;
            if apply {
                save_store(data_path, &store)?;
            }
        }
        Commands::Book { request, apply } => {
            let text = std::fs::read_to_string(&request)
                .with_context(|| format!("Failed to read file: {}", request.display()))?;
            let request: BookingRequest =
                serde_json::from_str(&text).context("Failed to parse booking request")?;
            match book_session(&store, &store, request, now, &config) {
                Ok(session) => {
                    print_json(&session)?;
                    if apply {
                        save_store(data_path, &store)?;
                    }
                }
                Err(EngineError::ResourceConflict(conflicts)) => {
                    print_json(&conflicts)?;
                    process::exit(EXIT_REJECTED);
                }
                Err(e) => return Err(e).context("Failed to book session"),
            }
        }
        Commands::Hours { student } => {
            let hours = completed_hours(&store.all_sessions(), StudentId(student));
            print_json(&hours)?;
        }
        Commands::Audit => {
            let found = find_double_bookings(&store.all_sessions());
            print_json(&found)?;
            if !found.is_empty() {
                tracing::warn!(count = found.len(), "double bookings present in data file");
                process::exit(EXIT_REJECTED);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("lesson_engine=debug,lessons=debug,info"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_store(path: &Path) -> Result<InMemoryStore> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let snapshot: StoreSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse data file: {}", path.display()))?;
    Ok(InMemoryStore::from_snapshot(snapshot))
}

fn save_store(path: &Path, store: &InMemoryStore) -> Result<()> {
    let json = serde_json::to_string_pretty(&store.snapshot())?;
    std::fs::write(path, json).with_context(|| format!("Failed to write file: {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    EngineConfig::from_json_str(&text)
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Accepts `HH:MM` or `HH:MM:SS`.
fn parse_time(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("invalid time '{}', expected HH:MM", s))
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS]`, with `T` or a space as separator.
fn parse_now(s: &str) -> std::result::Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("invalid timestamp '{}', expected YYYY-MM-DDTHH:MM", s))
}
