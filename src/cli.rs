use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand};

use crate::timefmt::parse_time_to_seconds;

#[derive(Parser, Debug)]
#[command(
    name = "caption-loop",
    version,
    about = "Caption sync and segment repeat for bilingual video transcripts"
)]
pub struct Cli {
    /// Optional JSON config file (backend URL and timing overrides).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a transcript from the backend and print it.
    Fetch(FetchArgs),
    /// Play a captions file against a simulated player and trace the sync engine.
    Replay(ReplayArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Video URL or identifier passed to the transcript backend.
    #[arg(value_name = "SOURCE")]
    pub source: String,
    /// Transcript backend base URL.
    #[arg(long)]
    pub backend: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Captions JSON in the backend's `{"captions": [...]}` shape.
    #[arg(value_name = "CAPTIONS")]
    pub captions: PathBuf,
    /// Starting position (seconds or MM:SS.d).
    #[arg(long, value_name = "TIME")]
    pub start: Option<String>,
    /// How long to run the simulation, in wall-clock seconds.
    #[arg(long, default_value_t = 5.0)]
    pub seconds: f64,
    /// Loop this caption index from the start of the run.
    #[arg(long, value_name = "INDEX")]
    pub repeat: Option<usize>,
}

impl ReplayArgs {
    pub fn start_position(&self) -> Result<f64> {
        match self.start.as_deref() {
            Some(raw) => parse_time_to_seconds(raw),
            None => Ok(0.0),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.seconds.is_finite() && self.seconds > 0.0,
            "--seconds must be positive, got {}",
            self.seconds
        );
        self.start_position()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_replay_with_clock_start() {
        let cli = Cli::try_parse_from([
            "caption-loop",
            "replay",
            "captions.json",
            "--start",
            "00:03.5",
            "--repeat",
            "1",
        ])
        .unwrap();
        let Command::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        args.validate().unwrap();
        approx::assert_abs_diff_eq!(args.start_position().unwrap(), 3.5, epsilon = 1e-9);
        assert_eq!(args.repeat, Some(1));
        assert_eq!(args.seconds, 5.0);
    }

    #[test]
    fn rejects_non_positive_duration() {
        let cli = Cli::try_parse_from([
            "caption-loop",
            "replay",
            "captions.json",
            "--seconds",
            "0",
        ])
        .unwrap();
        let Command::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from([
            "caption-loop",
            "fetch",
            "https://youtu.be/abcdefghijk",
            "--config",
            "settings.json",
        ])
        .unwrap();
        assert!(cli.config.is_some());
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.source, "https://youtu.be/abcdefghijk");
        assert!(args.backend.is_none());
    }
}
