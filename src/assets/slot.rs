//! Decode bookkeeping for the two image inputs.
//!
//! Decoding is the one step that may run off the editor's thread. Each request gets a ticket;
//! a completion is applied only when its ticket is still the latest one for the slot, so a slow
//! decode of an old selection can never overwrite a newer one.

use std::sync::Arc;

use crate::assets::decode::{ImageRole, MediaType, PreparedImage, decode_image};
use crate::foundation::error::PhotocardResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecodeTicket {
    role: ImageRole,
    generation: u64,
}

impl DecodeTicket {
    pub fn role(self) -> ImageRole {
        self.role
    }
}

/// Validated bytes waiting to be decoded. `Send`, so callers may run it on a worker.
#[derive(Debug)]
pub struct DecodeJob {
    pub ticket: DecodeTicket,
    pub media: MediaType,
    bytes: Vec<u8>,
}

impl DecodeJob {
    pub fn run(self) -> DecodeOutcome {
        let result = decode_image(&self.bytes);
        DecodeOutcome {
            ticket: self.ticket,
            result,
        }
    }
}

#[derive(Debug)]
pub struct DecodeOutcome {
    pub ticket: DecodeTicket,
    pub result: PhotocardResult<PreparedImage>,
}

/// What happened when an outcome was offered to a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotUpdate {
    Loaded,
    /// A newer request superseded this one; the result was dropped.
    Stale,
}

#[derive(Debug)]
pub struct ImageSlot {
    role: ImageRole,
    generation: u64,
    pending: Option<u64>,
    current: Option<Arc<PreparedImage>>,
}

impl ImageSlot {
    pub fn new(role: ImageRole) -> Self {
        Self {
            role,
            generation: 0,
            pending: None,
            current: None,
        }
    }

    pub fn role(&self) -> ImageRole {
        self.role
    }

    /// Start a new load. The previous handle is released so nothing renders until this resolves.
    pub fn request(&mut self, bytes: Vec<u8>, media: MediaType) -> DecodeJob {
        self.generation += 1;
        self.pending = Some(self.generation);
        self.current = None;
        DecodeJob {
            ticket: DecodeTicket {
                role: self.role,
                generation: self.generation,
            },
            media,
            bytes,
        }
    }

    /// Apply a finished decode.
    ///
    /// Stale outcomes are discarded whatever their result. A fresh failure clears the pending
    /// marker and leaves the slot empty, then propagates.
    pub fn resolve(&mut self, outcome: DecodeOutcome) -> PhotocardResult<SlotUpdate> {
        let DecodeOutcome { ticket, result } = outcome;
        if ticket.role != self.role || self.pending != Some(ticket.generation) {
            tracing::debug!(
                role = %self.role,
                ticket = ticket.generation,
                latest = self.generation,
                "discarding stale decode result"
            );
            return Ok(SlotUpdate::Stale);
        }

        self.pending = None;
        let image = result?;
        tracing::debug!(role = %self.role, width = image.width, height = image.height, "image ready");
        self.current = Some(Arc::new(image));
        Ok(SlotUpdate::Loaded)
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.current = None;
    }

    pub fn get(&self) -> Option<&Arc<PreparedImage>> {
        self.current.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
