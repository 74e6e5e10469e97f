//! Groups classified frames into GOPs.
//!
//! A GOP opens at an `I` frame and runs until the next one. Frames before
//! the first `I` frame form a GOP of their own, flagged `incomplete`.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::codec::{FrameInfo, FrameType};

/// Frames per bitstream type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTypeCounts {
    pub i: u64,
    pub p: u64,
    pub b: u64,
    pub unknown: u64,
}

impl FrameTypeCounts {
    pub fn add(&mut self, frame_type: FrameType) {
        match frame_type {
            FrameType::I => self.i += 1,
            FrameType::P => self.p += 1,
            FrameType::B => self.b += 1,
            FrameType::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.i + self.p + self.b + self.unknown
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gop {
    pub index: usize,
    pub frames: Vec<FrameInfo>,
    /// The stream started without an `I` frame.
    pub incomplete: bool,
    pub counts: FrameTypeCounts,
}

impl Gop {
    fn new(index: usize, incomplete: bool) -> Self {
        Self {
            index,
            frames: Vec::new(),
            incomplete,
            counts: FrameTypeCounts::default(),
        }
    }

    fn push(&mut self, frame: FrameInfo) {
        self.counts.add(frame.frame_type);
        self.frames.push(frame);
    }

    /// Timestamp of the first frame.
    pub fn start_ms(&self) -> u32 {
        self.frames.first().map_or(0, |frame| frame.timestamp_ms)
    }

    /// Timestamp of the last frame.
    pub fn end_ms(&self) -> u32 {
        self.frames.last().map_or(0, |frame| frame.timestamp_ms)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames carrying the container keyframe flag.
    pub fn keyframe_count(&self) -> usize {
        self.frames.iter().filter(|frame| frame.is_keyframe).count()
    }

    /// Sum of the frame payload sizes.
    pub fn size(&self) -> u64 {
        self.frames.iter().map(|frame| frame.size as u64).sum()
    }
}

impl Serialize for Gop {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Gop", 9)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field("startMs", &self.start_ms())?;
        state.serialize_field("endMs", &self.end_ms())?;
        state.serialize_field("len", &self.len())?;
        state.serialize_field("size", &self.size())?;
        state.serialize_field("keyframeCount", &self.keyframe_count())?;
        state.serialize_field("incomplete", &self.incomplete)?;
        state.serialize_field("counts", &self.counts)?;
        state.serialize_field("frames", &self.frames)?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GopState {
    /// No frame seen yet.
    Idle,
    Collecting,
    /// `finish` was called, further frames are dropped.
    Closed,
}

#[derive(Debug)]
pub struct GopReconstructor {
    state: GopState,
    current: Option<Gop>,
    gops: Vec<Gop>,
    counts: FrameTypeCounts,
}

impl Default for GopReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl GopReconstructor {
    pub fn new() -> Self {
        Self {
            state: GopState::Idle,
            current: None,
            gops: Vec::new(),
            counts: FrameTypeCounts::default(),
        }
    }

    pub fn state(&self) -> GopState {
        self.state
    }

    pub fn push(&mut self, frame: FrameInfo) {
        match self.state {
            GopState::Closed => {
                debug!(timestamp_ms = frame.timestamp_ms, "GOP reconstructor closed, frame dropped");
                return;
            }
            GopState::Idle => {
                self.current = Some(Gop::new(0, frame.frame_type != FrameType::I));
                self.state = GopState::Collecting;
            }
            GopState::Collecting if frame.frame_type == FrameType::I => {
                let index = self.gops.len() + 1;
                if let Some(done) = self.current.replace(Gop::new(index, false)) {
                    self.gops.push(done);
                }
            }
            GopState::Collecting => {}
        }

        self.counts.add(frame.frame_type);
        if let Some(gop) = self.current.as_mut() {
            gop.push(frame);
        }
    }

    /// Emits the GOP in progress. Idempotent.
    pub fn finish(&mut self) {
        if let Some(gop) = self.current.take() {
            self.gops.push(gop);
        }
        self.state = GopState::Closed;
    }

    /// GOPs closed so far.
    pub fn gops(&self) -> &[Gop] {
        &self.gops
    }

    /// Frame counts over every GOP, including the one in progress.
    pub fn counts(&self) -> FrameTypeCounts {
        self.counts
    }

    pub fn into_gops(mut self) -> Vec<Gop> {
        self.finish();
        self.gops
    }
}
