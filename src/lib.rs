//! Playback-to-caption synchronization and repeat-loop engine for a
//! bilingual caption video player.

pub mod cli;
pub mod config;
pub mod fetch;
pub mod sync;
pub mod timefmt;
pub mod types;
