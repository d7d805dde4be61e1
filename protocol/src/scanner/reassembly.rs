//! # Frame Reassembler
//!
//! Large payloads are split across several QR codes that the online wallet
//! cycles through on screen. The camera catches them in whatever order it
//! likes, often seeing the same one many times in a row, so the reassembler
//! has to be indifferent to both arrival order and repetition.
//!
//! ## Rules
//!
//! - The first frame of a session fixes the total.
//! - Frames with a different total, or an out-of-range index, are ignored.
//! - A repeated index never overwrites what is already buffered.
//! - Output is concatenated by ascending index, never by arrival order.
//! - `Complete` fires once. After it the buffer is drained and stray frames
//!   of the same session only report full progress.
//!
//! Nothing here ever fails. Anything unexpected leaves the state unchanged
//! and is reported as [`ReassemblyOutcome::Pending`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use super::decoder::SubstrateFrame;

/// Bytes of a fully reassembled payload. Not `Clone`: it is handed to the
/// classifier by value and consumed there.
#[derive(Debug, PartialEq, Eq)]
pub struct CompletedPayload {
    bytes: Vec<u8>,
}

impl CompletedPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Live progress for the scan screen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReassemblyProgress {
    pub completed: u32,
    pub total: u32,
    /// Missing frame indices, zero-based, ascending.
    pub missing: Vec<u32>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReassemblyOutcome {
    Pending(ReassemblyProgress),
    Complete { payload: CompletedPayload },
}

/// Buffered frames of one multi-part payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReassemblyState {
    pub total_frames: u32,
    pub received_frames: BTreeSet<u32>,
    pub frame_buffer: BTreeMap<u32, Vec<u8>>,
    pub is_complete: bool,
}

impl ReassemblyState {
    fn is_empty(&self) -> bool {
        self.total_frames == 0
    }

    fn progress(&self) -> ReassemblyProgress {
        let missing = (0..self.total_frames)
            .filter(|i| !self.received_frames.contains(i))
            .collect();
        ReassemblyProgress {
            completed: self.received_frames.len() as u32,
            total: self.total_frames,
            missing,
        }
    }
}

/// Collects frames until a payload is whole.
#[derive(Debug, Default)]
pub struct Reassembler {
    state: ReassemblyState,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame.
    pub fn accept(&mut self, frame: SubstrateFrame) -> ReassemblyOutcome {
        let SubstrateFrame {
            frame_index,
            frame_count,
            part_data,
        } = frame;

        if self.state.is_empty() {
            if frame_count == 1 {
                // Single-frame payloads never touch the buffer.
                return ReassemblyOutcome::Complete {
                    payload: CompletedPayload::new(part_data),
                };
            }
            if frame_count == 0 {
                warn!("ignoring frame with zero frame count");
                return ReassemblyOutcome::Pending(self.state.progress());
            }
            self.state.total_frames = frame_count;
            debug!(total = frame_count, "multipart session started");
        }

        if frame_count != self.state.total_frames {
            warn!(
                expected = self.state.total_frames,
                got = frame_count,
                "ignoring frame from a different payload"
            );
            return ReassemblyOutcome::Pending(self.state.progress());
        }
        if frame_index >= self.state.total_frames {
            warn!(frame_index, total = frame_count, "ignoring out-of-range frame");
            return ReassemblyOutcome::Pending(self.state.progress());
        }
        if self.state.is_complete {
            return ReassemblyOutcome::Pending(self.state.progress());
        }

        if let Some(existing) = self.state.frame_buffer.get(&frame_index) {
            if *existing != part_data {
                warn!(frame_index, "conflicting bytes for buffered frame, keeping the first");
            }
            return ReassemblyOutcome::Pending(self.state.progress());
        }

        self.state.frame_buffer.insert(frame_index, part_data);
        self.state.received_frames.insert(frame_index);
        debug!(
            frame_index,
            received = self.state.received_frames.len(),
            total = self.state.total_frames,
            "frame buffered"
        );

        if self.state.received_frames.len() as u32 == self.state.total_frames {
            self.state.is_complete = true;
            // BTreeMap iterates in ascending key order.
            let bytes = std::mem::take(&mut self.state.frame_buffer)
                .into_values()
                .flatten()
                .collect();
            debug!(total = self.state.total_frames, "multipart payload complete");
            return ReassemblyOutcome::Complete {
                payload: CompletedPayload::new(bytes),
            };
        }

        ReassemblyOutcome::Pending(self.state.progress())
    }

    pub fn progress(&self) -> ReassemblyProgress {
        self.state.progress()
    }

    pub fn state(&self) -> &ReassemblyState {
        &self.state
    }

    /// `true` while a multi-part payload is partially buffered.
    pub fn is_in_progress(&self) -> bool {
        !self.state.is_empty() && !self.state.is_complete
    }

    /// Forget everything. Called on success, failure, cancel and "start over".
    pub fn clear_multipart_progress(&mut self) {
        self.state = ReassemblyState::default();
    }
}
