use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Exports Chronos timetables to iCalendar files.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// JSON timetable configuration; the built-in group table is used when absent
    #[arg(long, global = true, env = "CHRONOS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base log level for this crate (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Base URL of the timetable application
    #[arg(long, global = true, env = "CHRONOS_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Exports one group's timetable
    Fetch {
        /// Group name, as listed in the group table
        #[arg(long)]
        group: String,
        /// Promotion label used in event identifiers
        #[arg(long)]
        promo: String,
        /// Number of weeks to collect
        #[arg(long, default_value_t = chronos::ade::DEFAULT_WEEKS)]
        weeks: u32,
        /// Date label of the first week (e.g. 02/09/2024); week 0 when absent
        #[arg(long)]
        date: Option<String>,
        /// Output file; standard output when absent
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Exports every group in the batch plan and renders the index
    Build {
        #[arg(long, default_value = "build")]
        output_dir: PathBuf,
        /// Concurrent remote sessions
        #[arg(long, default_value_t = 5)]
        workers: usize,
        #[arg(long, default_value_t = chronos::ade::DEFAULT_WEEKS)]
        weeks: u32,
    },
    /// Serves the exported calendars over HTTP
    Serve {
        #[arg(long, default_value = "build")]
        output_dir: PathBuf,
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}
