//! Deterministic randomness for action execution.
//!
//! The seed is a SHA-256 digest of data every executor has identically: the
//! block index, the signer, the canonical encoding of the action and its
//! position within the block. Nothing local (time, entropy, thread order)
//! contributes.

use chronicle_types::{Action, Address};
use commonware_codec::Encode;
use commonware_cryptography::{sha256::Sha256, Hasher};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use uuid::Uuid;

const RANDOM_NAMESPACE: &[u8] = b"_CHRONICLE_ACTION_RANDOM";

/// A seeded ChaCha20 stream.
///
/// Two sources built from the same seed and called in the same order return
/// the same values.
#[derive(Clone, Debug)]
pub struct Random {
    seed: [u8; 32],
    rng: ChaCha20Rng,
}

impl Random {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            rng: ChaCha20Rng::from_seed(seed),
        }
    }

    /// Seeds a source for the action at `position` within block `block_index`.
    pub fn for_action(block_index: u64, position: u32, signer: &Address, action: &Action) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(RANDOM_NAMESPACE);
        hasher.update(&block_index.to_be_bytes());
        hasher.update(&position.to_be_bytes());
        hasher.update(signer.as_ref());
        hasher.update(&action.encode());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(hasher.finalize().as_ref());
        Self::new(seed)
    }

    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// Uniform draw from `[0, bound)`. A zero bound yields zero.
    pub fn next_int(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }

    /// A version 4 identifier built from the next 16 bytes of the stream.
    pub fn next_guid(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}
