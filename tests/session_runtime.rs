use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use caption_loop::config::SyncTimings;
use caption_loop::fetch::{FetchError, StaticTranscript};
use caption_loop::sync::{
    LoadStatus, PlayerBackend, PlayerState, SessionRuntime, SessionUpdate, SimulatedPlayer,
    SyncSnapshot,
};
use caption_loop::types::CaptionSegment;

const WAIT: Duration = Duration::from_secs(3);

fn fast_timings() -> SyncTimings {
    SyncTimings {
        poll_interval_ms: 10,
        seek_guard_ms: 30,
        pause_confirm_ms: 200,
        scroll_cooldown_ms: 150,
        loop_epsilon: 0.1,
    }
}

fn hi_bye() -> StaticTranscript {
    StaticTranscript::new(vec![
        CaptionSegment::new(0.0, 3.0).with_text("english", "Hi"),
        CaptionSegment::new(3.0, 2.0).with_text("english", "Bye"),
    ])
}

fn ready_session(player: &SimulatedPlayer) -> Result<SessionRuntime> {
    let runtime = SessionRuntime::new(fast_timings(), Arc::new(hi_bye()))?;
    let controller = runtime.controller();
    controller.load("https://youtu.be/abcdefghijk")?;
    if runtime
        .wait_for(WAIT, |s| s.load == LoadStatus::Ready { segments: 2 })
        .is_none()
    {
        bail!("captions never loaded");
    }
    controller.player_ready(player.clone())?;
    controller.player_state_changed(PlayerState::Playing)?;
    Ok(runtime)
}

fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Collect every update up to and including the first matching snapshot
fn updates_until(
    runtime: &SessionRuntime,
    mut predicate: impl FnMut(&SyncSnapshot) -> bool,
) -> Option<Vec<SessionUpdate>> {
    let deadline = Instant::now() + WAIT;
    let mut seen = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        let update = runtime.recv_timeout(remaining)?;
        let done = matches!(&update, SessionUpdate::Snapshot(s) if predicate(s));
        seen.push(update);
        if done {
            return Some(seen);
        }
    }
    None
}

#[test]
fn session_tracks_playback_and_loops_clicked_caption() -> Result<()> {
    let player = SimulatedPlayer::manual(1.0);
    let runtime = ready_session(&player)?;
    let controller = runtime.controller();

    assert!(runtime
        .wait_for(WAIT, |s| s.active_index == Some(0))
        .is_some());
    player.set_position(3.5);
    assert!(runtime
        .wait_for(WAIT, |s| s.active_index == Some(1))
        .is_some());

    controller.click_caption(0)?;
    let looping = runtime
        .wait_for(WAIT, |s| s.repeat.segment_index == Some(0))
        .expect("loop engaged");
    assert_eq!(looping.active_index, Some(0));
    assert!(eventually(|| player.seeks() == vec![(0.0, true)]));

    player.set_position(2.95);
    assert!(eventually(|| player.seeks().len() >= 2));
    assert_eq!(player.seeks()[1], (0.0, true));

    assert_eq!(player.current_time(), 0.0);
    for update in runtime.drain() {
        if let SessionUpdate::Snapshot(snapshot) = update {
            assert!(snapshot.repeat.active);
            assert_eq!(snapshot.active_index, Some(0));
        }
    }
    Ok(())
}

#[test]
fn confirmed_pause_stops_the_loop() -> Result<()> {
    let player = SimulatedPlayer::manual(3.5);
    let runtime = ready_session(&player)?;
    let controller = runtime.controller();
    controller.click_caption(1)?;
    assert!(runtime.wait_for(WAIT, |s| s.repeat.active).is_some());

    player.set_state(PlayerState::Paused);
    controller.player_state_changed(PlayerState::Paused)?;
    let stopped = runtime
        .wait_for(WAIT, |s| !s.repeat.active)
        .expect("loop cleared");
    assert_eq!(stopped.repeat.segment_index, None);
    assert!(!stopped.pause_pending);
    assert_eq!(player.state(), PlayerState::Paused);
    Ok(())
}

#[test]
fn transient_pause_resumes_the_loop() -> Result<()> {
    let player = SimulatedPlayer::manual(3.5);
    let runtime = ready_session(&player)?;
    let controller = runtime.controller();
    controller.click_caption(1)?;
    assert!(runtime.wait_for(WAIT, |s| s.repeat.active).is_some());
    assert!(eventually(|| player.seeks().len() == 1));

    controller.player_state_changed(PlayerState::Paused)?;
    assert!(runtime.wait_for(WAIT, |s| s.pause_pending).is_some());
    player.set_state(PlayerState::Playing);

    assert!(runtime
        .wait_for(WAIT, |s| !s.pause_pending)
        .is_some_and(|s| s.repeat.segment_index == Some(1)));
    assert!(eventually(|| player.seeks().len() == 2));
    assert_eq!(player.seeks()[1], (3.0, true));
    Ok(())
}

#[test]
fn manual_scroll_holds_auto_scroll_until_cooldown() -> Result<()> {
    let player = SimulatedPlayer::manual(1.0);
    let runtime = ready_session(&player)?;
    let controller = runtime.controller();

    let first = updates_until(&runtime, |s| s.active_index == Some(0)).expect("first caption");
    assert!(first.contains(&SessionUpdate::ScrollTo(0)));

    controller.user_scrolled()?;
    assert!(runtime.wait_for(WAIT, |s| s.user_scrolling).is_some());
    player.set_position(3.5);
    let during = updates_until(&runtime, |s| s.active_index == Some(1)).expect("second caption");
    assert!(!during.contains(&SessionUpdate::ScrollTo(1)));

    assert!(runtime.wait_for(WAIT, |s| !s.user_scrolling).is_some());
    player.set_position(1.0);
    let after = updates_until(&runtime, |s| s.active_index == Some(0)).expect("back to first");
    assert!(after.contains(&SessionUpdate::ScrollTo(0)));
    Ok(())
}

#[test]
fn blank_source_is_rejected_without_state_change() -> Result<()> {
    let runtime = SessionRuntime::new(fast_timings(), Arc::new(hi_bye()))?;
    runtime.controller().load("   ")?;

    let deadline = Instant::now() + WAIT;
    let mut rejected = None;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match runtime.recv_timeout(remaining) {
            Some(SessionUpdate::InputRejected(message)) => {
                rejected = Some(message);
                break;
            }
            Some(SessionUpdate::Snapshot(snapshot)) => {
                assert_eq!(snapshot.load, LoadStatus::Empty)
            }
            Some(_) => {}
            None => break,
        }
    }
    assert_eq!(rejected, Some(FetchError::InvalidInput.to_string()));
    Ok(())
}

#[test]
fn empty_transcript_reports_failure() -> Result<()> {
    let runtime = SessionRuntime::new(fast_timings(), Arc::new(StaticTranscript::default()))?;
    runtime.controller().load("https://youtu.be/abcdefghijk")?;
    let failed = runtime
        .wait_for(WAIT, |s| matches!(s.load, LoadStatus::Failed(_)))
        .expect("load failure");
    assert_eq!(failed.load, LoadStatus::Failed(FetchError::Empty.to_string()));
    assert_eq!(failed.active_index, None);
    Ok(())
}

#[test]
fn dropping_runtime_stops_sampling() -> Result<()> {
    let player = SimulatedPlayer::manual(3.5);
    let runtime = ready_session(&player)?;
    runtime.controller().click_caption(1)?;
    assert!(runtime.wait_for(WAIT, |s| s.repeat.active).is_some());
    assert!(eventually(|| player.seeks().len() == 1));
    drop(runtime);

    player.set_position(4.95);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(player.seeks().len(), 1);
    Ok(())
}

#[test]
fn invalid_timings_are_refused() {
    let timings = SyncTimings {
        poll_interval_ms: 0,
        ..fast_timings()
    };
    assert!(SessionRuntime::new(timings, Arc::new(hi_bye())).is_err());
}
