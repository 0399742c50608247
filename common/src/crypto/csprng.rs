//! Cryptographically secure random number generation for draws.
//!
//! All draw randomness comes from an AES-256-CTR keystream seeded once from
//! the operating system CSPRNG (OsRng). Entropy failure at seeding time is a
//! startup failure: the process must refuse to serve draws without it.
//!
//! SECURITY: OsRng is the only entropy source used here. thread_rng() is NOT
//! acceptable for winner selection.

use std::sync::Mutex;

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

#[derive(Debug, Error)]
pub enum RngError {
    #[error("failed to gather seed entropy: {0}")]
    Entropy(#[from] rand::Error),
    #[error("random generator lock was poisoned")]
    Poisoned,
}

/// Source of uniform random words for the samplers.
///
/// Production uses [`Csprng`]; tests substitute a deterministic stream.
pub trait RandomSource: Send + Sync {
    /// Return a single uniform 32-bit word.
    fn next_u32(&self) -> Result<u32, RngError>;

    /// Fill `buf` entirely with random bytes.
    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), RngError>;
}

/// AES-256-CTR keystream generator.
///
/// The cipher state lives behind a mutex so that any number of concurrent
/// callers observe a serializable order of outputs.
pub struct Csprng {
    stream: Mutex<Aes256Ctr>,
}

impl Csprng {
    /// Seed a fresh generator: a 256-bit key and a 128-bit initial counter
    /// are drawn from the platform entropy source.
    pub fn from_entropy() -> Result<Self, RngError> {
        let mut key = [0u8; 32];
        OsRng.try_fill_bytes(&mut key)?;
        let mut iv = [0u8; 16];
        OsRng.try_fill_bytes(&mut iv)?;

        Ok(Self {
            stream: Mutex::new(Aes256Ctr::new(&key.into(), &iv.into())),
        })
    }
}

impl RandomSource for Csprng {
    fn next_u32(&self) -> Result<u32, RngError> {
        let mut word = [0u8; 4];
        self.fill_bytes(&mut word)?;
        Ok(u32::from_be_bytes(word))
    }

    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), RngError> {
        let mut stream = self.stream.lock().map_err(|_| RngError::Poisoned)?;
        // XOR over a zeroed buffer leaves the raw keystream
        buf.fill(0);
        stream.apply_keystream(buf);
        Ok(())
    }
}
