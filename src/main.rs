use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use caption_loop::cli::{Cli, Command, FetchArgs, ReplayArgs};
use caption_loop::config::AppConfig;
use caption_loop::fetch::{FileTranscriptSource, HttpTranscriptClient, TranscriptFetcher};
use caption_loop::sync::{
    LoadStatus, PlayerBackend, PlayerState, SessionRuntime, SessionUpdate, SimulatedPlayer,
};
use caption_loop::timefmt::format_time;
use caption_loop::types::{CaptionIndex, CaptionSegment};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match &cli.command {
        Command::Fetch(args) => handle_fetch(&cli, args),
        Command::Replay(args) => handle_replay(&cli, args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_fetch(cli: &Cli, args: &FetchArgs) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref(), args.backend.clone())
        .context("Failed to load configuration")?;
    let client = HttpTranscriptClient::new(&config.backend_url)?;
    let index = client
        .fetch(&args.source)
        .with_context(|| format!("Failed to fetch transcript for '{}'", args.source))?;
    print_transcript(&index);
    Ok(())
}

fn print_transcript(index: &CaptionIndex) {
    let languages = index.languages();
    println!(
        "{} captions ({})",
        index.len(),
        if languages.is_empty() {
            "no text".to_string()
        } else {
            languages.join(", ")
        }
    );
    for (position, segment) in index.iter().enumerate() {
        println!("#{:<4} {}", position, format_time(segment.start));
        for language in &languages {
            if let Some(text) = segment.text(language) {
                println!("      {}", text);
            }
        }
    }
}

fn handle_replay(cli: &Cli, args: &ReplayArgs) -> Result<()> {
    args.validate()
        .context("Failed to validate replay arguments")?;
    let config =
        AppConfig::load(cli.config.as_deref(), None).context("Failed to load configuration")?;
    let start = args.start_position()?;

    let source = FileTranscriptSource::new(&args.captions);
    let runtime = SessionRuntime::new(config.timings, Arc::new(source))?;
    let controller = runtime.controller();
    controller.load(args.captions.display().to_string())?;
    let captions = wait_for_captions(&runtime)?;
    println!("Loaded {} captions from {:?}", captions.len(), args.captions);

    let mut player = SimulatedPlayer::new(start);
    player.play();
    controller.player_ready(player.clone())?;
    controller.player_state_changed(PlayerState::Playing)?;
    if let Some(index) = args.repeat {
        if captions.get(index).is_none() {
            bail!(
                "--repeat {} is out of range ({} captions)",
                index,
                captions.len()
            );
        }
        controller.click_caption(index)?;
    }

    let deadline = Instant::now() + Duration::from_secs_f64(args.seconds);
    let mut active = None;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match runtime.recv_timeout(remaining) {
            Some(SessionUpdate::Snapshot(snapshot)) if snapshot.active_index != active => {
                active = snapshot.active_index;
                if let Some(index) = active {
                    if let Some(segment) = captions.get(index) {
                        print_active(index, segment, snapshot.repeat.active);
                    }
                }
            }
            Some(_) => {}
            None => break,
        }
    }

    drop(runtime);
    println!(
        "Stopped at {} after {} seek(s)",
        format_time(player.current_time()),
        player.seeks().len()
    );
    Ok(())
}

fn wait_for_captions(runtime: &SessionRuntime) -> Result<CaptionIndex> {
    let deadline = Instant::now() + LOAD_TIMEOUT;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match runtime.recv_timeout(remaining) {
            Some(SessionUpdate::CaptionsLoaded(index)) => return Ok(index),
            Some(SessionUpdate::Snapshot(snapshot)) => {
                if let LoadStatus::Failed(message) = snapshot.load {
                    bail!("Failed to load captions: {}", message);
                }
            }
            Some(SessionUpdate::InputRejected(message)) => bail!("{}", message),
            Some(SessionUpdate::ScrollTo(_)) => {}
            None => break,
        }
    }
    bail!("Timed out waiting for captions")
}

fn print_active(index: usize, segment: &CaptionSegment, looping: bool) {
    let marker = if looping { "↻" } else { "▶" };
    let text = segment
        .texts
        .iter()
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join(" | ");
    println!(
        "{} {} #{} {}",
        marker,
        format_time(segment.start),
        index,
        text
    );
}
