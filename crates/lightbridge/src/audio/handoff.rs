//! Chunk handoff between the capture callback and the processing loop.
//!
//! The producer fills one buffer while the other holds the last complete
//! chunk. A chunk is only published once full, so the consumer never sees a
//! partial write. If the consumer falls behind, the unread chunk is replaced
//! by the newer one and counted as an overrun.

use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
struct Slots {
    filling: Vec<i16>,
    ready: Vec<i16>,
    fresh: bool,
    overruns: u64,
}

#[derive(Debug, Clone)]
pub struct ChunkHandoff {
    slots: Arc<Mutex<Slots>>,
    chunk_size: usize,
}

impl ChunkHandoff {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                filling: Vec::with_capacity(chunk_size),
                ready: Vec::with_capacity(chunk_size),
                fresh: false,
                overruns: 0,
            })),
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Producer side: appends samples, publishing every completed chunk
    pub fn push_samples<I: IntoIterator<Item = i16>>(&self, samples: I) {
        let mut guard = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slots = &mut *guard;

        for sample in samples {
            slots.filling.push(sample);
            if slots.filling.len() >= self.chunk_size {
                std::mem::swap(&mut slots.filling, &mut slots.ready);
                slots.filling.clear();
                if slots.fresh {
                    slots.overruns += 1;
                }
                slots.fresh = true;
            }
        }
    }

    /// Consumer side: copies the freshest complete chunk into `out`.
    ///
    /// Returns false (leaving `out` alone) when no new chunk has arrived.
    pub fn take_latest(&self, out: &mut Vec<i16>) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if !slots.fresh {
            return false;
        }
        out.clear();
        out.extend_from_slice(&slots.ready);
        slots.fresh = false;
        true
    }

    /// Chunks dropped because a newer one replaced them unread
    pub fn overruns(&self) -> u64 {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .overruns
    }

    /// Drops any partial or unread chunk
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.filling.clear();
        slots.ready.clear();
        slots.fresh = false;
    }
}
