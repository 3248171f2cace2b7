//! Core caption types shared by the sync engine, the fetch layer and the CLI

use serde::Deserialize;
use serde_json::{Map, Value};

/// A time-coded caption entry with per-language text
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSegment {
    pub start: f64,    // seconds
    pub duration: f64, // seconds
    /// `(language, text)` pairs in the order the source listed them
    pub texts: Vec<(String, String)>,
}

impl CaptionSegment {
    pub fn new(start: f64, duration: f64) -> Self {
        Self {
            start,
            duration,
            texts: Vec::new(),
        }
    }

    /// Attach text for one language, replacing any earlier text for it
    pub fn with_text(mut self, language: impl Into<String>, text: impl Into<String>) -> Self {
        let (language, text) = (language.into(), text.into());
        match self.texts.iter_mut().find(|(key, _)| *key == language) {
            Some((_, existing)) => *existing = text,
            None => self.texts.push((language, text)),
        }
        self
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Half-open containment: `start <= time < start + duration`
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }

    pub fn text(&self, language: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(key, _)| key == language)
            .map(|(_, text)| text.as_str())
    }
}

/// Caption record as delivered by the transcript backend.
///
/// Every string-valued field other than `start`/`duration` is a language
/// line; anything else is dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCaption {
    pub start: f64,
    pub duration: f64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RawCaption {
    fn into_segment(self, position: usize) -> Result<CaptionSegment, InvalidCaption> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(InvalidCaption {
                position,
                reason: format!("start must be a non-negative number, got {}", self.start),
            });
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(InvalidCaption {
                position,
                reason: format!("duration must be positive, got {}", self.duration),
            });
        }
        let texts = self
            .fields
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(text) => Some((key, text)),
                _ => None,
            })
            .collect();
        Ok(CaptionSegment {
            start: self.start,
            duration: self.duration,
            texts,
        })
    }
}

/// Document shape returned by the transcript backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptDocument {
    #[serde(default)]
    pub captions: Vec<RawCaption>,
}

/// A caption record that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCaption {
    pub position: usize,
    pub reason: String,
}

impl std::fmt::Display for InvalidCaption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "caption {}: {}", self.position, self.reason)
    }
}

impl std::error::Error for InvalidCaption {}

/// Ordered captions for one video session.
///
/// Order is whatever the source delivered; lookups scan it front to back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionIndex {
    segments: Vec<CaptionSegment>,
}

impl CaptionIndex {
    pub fn new(segments: Vec<CaptionSegment>) -> Self {
        Self { segments }
    }

    /// Validate raw backend records into an index
    pub fn from_raw(records: Vec<RawCaption>) -> Result<Self, InvalidCaption> {
        let segments = records
            .into_iter()
            .enumerate()
            .map(|(position, raw)| raw.into_segment(position))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Index of the first segment containing `time`, in stored order.
    ///
    /// Overlapping segments resolve to the earliest-ordered match.
    pub fn lookup(&self, time: f64) -> Option<usize> {
        self.segments
            .iter()
            .position(|segment| segment.contains(time))
    }

    pub fn get(&self, index: usize) -> Option<&CaptionSegment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaptionSegment> {
        self.segments.iter()
    }

    /// Language keys taken from the first segment
    pub fn languages(&self) -> Vec<String> {
        self.segments
            .first()
            .map(|segment| segment.texts.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }
}

/// Snapshot of the repeat-loop controller for the UI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepeatState {
    pub active: bool,
    pub segment: Option<CaptionSegment>,
    pub segment_index: Option<usize>,
}

impl RepeatState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn looping(index: usize, segment: CaptionSegment) -> Self {
        Self {
            active: true,
            segment: Some(segment),
            segment_index: Some(index),
        }
    }

    /// True when `index` is the pinned segment of an active loop
    pub fn pins(&self, index: usize) -> bool {
        self.active && self.segment_index == Some(index)
    }
}
