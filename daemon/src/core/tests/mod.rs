mod service_tests;

use std::{collections::VecDeque, sync::Mutex};

use promodraw_common::crypto::{RandomSource, RngError};

/// Deterministic word stream for protocol tests. Panics when the stream
/// runs dry so a test consuming more words than scripted fails loudly.
pub struct SequenceSource {
    words: Mutex<VecDeque<u32>>,
}

impl SequenceSource {
    pub fn new(words: impl IntoIterator<Item = u32>) -> Self {
        Self {
            words: Mutex::new(words.into_iter().collect()),
        }
    }
}

impl RandomSource for SequenceSource {
    fn next_u32(&self) -> Result<u32, RngError> {
        Ok(self
            .words
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted word sequence exhausted"))
    }

    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), RngError> {
        for chunk in buf.chunks_mut(4) {
            let word = self.next_u32()?.to_be_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Ok(())
    }
}

/// A source that always yields the same word, for attempt-cap tests.
pub struct ConstSource(pub u32);

impl RandomSource for ConstSource {
    fn next_u32(&self) -> Result<u32, RngError> {
        Ok(self.0)
    }

    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), RngError> {
        let word = self.0.to_be_bytes();
        for chunk in buf.chunks_mut(4) {
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Ok(())
    }
}
