//! boundary to the confidential-computation co-processor
//!
//! the engine never does arithmetic on encrypted values. it holds opaque
//! handles and delegates registration, random draws, decryption requests,
//! equality checks and aggregate tier tallies across this boundary.
//! decryption is fire-and-forget: the answer arrives later through the
//! oracle callback, never as a return value.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::{Error, Result};
use crate::tier::{self, Tier};
use crate::types::{AccountId, RoundId, ValueHandle, MAX_NUMBER};

/// a decryption request the oracle has not answered yet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDecryption {
    pub round_id: RoundId,
    pub handle: ValueHandle,
}

/// aggregate winner counts from a confidential tally; individual ticket
/// numbers are never disclosed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TierTally {
    pub jackpot: u64,
    pub silver: u64,
    pub bronze: u64,
}

pub trait Coprocessor {
    /// validate a ciphertext and its proof of well-formed plaintext,
    /// register the value and return its handle
    fn validate_and_register(
        &mut self,
        ciphertext: &[u8],
        proof: &[u8],
        owner: AccountId,
    ) -> Result<ValueHandle>;

    /// draw a uniformly random encrypted value in [1, bound]
    fn draw_random(&mut self, bound: u64) -> Result<ValueHandle>;

    /// queue a decryption of `handle`; completion arrives via the oracle
    /// callback tagged with `round_id`
    fn request_decryption(&mut self, handle: ValueHandle, round_id: &str) -> Result<()>;

    /// confidential equality check between a stored handle and a
    /// caller-supplied plaintext
    fn verify_equals(&self, handle: ValueHandle, plaintext: u64) -> Result<bool>;

    /// count how many handles fall into each prize tier against the
    /// revealed winning number
    fn tally_tiers(&self, handles: &[ValueHandle], winning: u64) -> Result<TierTally>;
}

/// in-process co-processor for development and tests, standing in for
/// the external fhe boundary. plaintexts live in a private map keyed by
/// handle; the engine only ever sees the handles.
///
/// dev wire format: ciphertext is the 8-byte little-endian plaintext,
/// proof is blake3(ciphertext || owner).
pub struct LocalCoprocessor {
    values: HashMap<ValueHandle, u64>,
    pending: Vec<PendingDecryption>,
    rng: ChaCha20Rng,
    nonce: u64,
}

impl LocalCoprocessor {
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            values: HashMap::new(),
            pending: Vec::new(),
            rng: ChaCha20Rng::seed_from_u64(seed),
            nonce: 0,
        }
    }

    /// client-side helper: produce the dev ciphertext and proof for a
    /// chosen number
    pub fn encrypt(value: u64, owner: AccountId) -> (Vec<u8>, Vec<u8>) {
        let ciphertext = value.to_le_bytes().to_vec();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&ciphertext);
        hasher.update(&owner.0);
        let proof = hasher.finalize().as_bytes().to_vec();
        (ciphertext, proof)
    }

    /// drain queued decryption requests; the caller plays the oracle
    pub fn take_pending(&mut self) -> Vec<PendingDecryption> {
        std::mem::take(&mut self.pending)
    }

    /// oracle-side decryption of a handle
    pub fn decrypt(&self, handle: ValueHandle) -> Option<u64> {
        self.values.get(&handle).copied()
    }

    fn fresh_handle(&mut self, ciphertext: &[u8], owner: &AccountId) -> ValueHandle {
        self.nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(ciphertext);
        hasher.update(&owner.0);
        hasher.update(&self.nonce.to_le_bytes());
        ValueHandle::from_raw(*hasher.finalize().as_bytes())
    }
}

impl Default for LocalCoprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Coprocessor for LocalCoprocessor {
    fn validate_and_register(
        &mut self,
        ciphertext: &[u8],
        proof: &[u8],
        owner: AccountId,
    ) -> Result<ValueHandle> {
        let bytes: [u8; 8] = ciphertext.try_into().map_err(|_| Error::InvalidCiphertext)?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(ciphertext);
        hasher.update(&owner.0);
        if proof != hasher.finalize().as_bytes() {
            return Err(Error::InvalidCiphertext);
        }

        // proof of well-formed plaintext includes the range bound
        let value = u64::from_le_bytes(bytes);
        if value == 0 || value > MAX_NUMBER {
            return Err(Error::InvalidCiphertext);
        }

        let handle = self.fresh_handle(ciphertext, &owner);
        self.values.insert(handle, value);
        Ok(handle)
    }

    fn draw_random(&mut self, bound: u64) -> Result<ValueHandle> {
        let value = self.rng.gen_range(1..=bound);
        let ciphertext = value.to_le_bytes();
        let handle = self.fresh_handle(&ciphertext, &AccountId::default());
        self.values.insert(handle, value);
        Ok(handle)
    }

    fn request_decryption(&mut self, handle: ValueHandle, round_id: &str) -> Result<()> {
        self.pending.push(PendingDecryption {
            round_id: round_id.to_string(),
            handle,
        });
        Ok(())
    }

    fn verify_equals(&self, handle: ValueHandle, plaintext: u64) -> Result<bool> {
        let value = self
            .values
            .get(&handle)
            .ok_or(Error::InvalidCiphertext)?;
        Ok(*value == plaintext)
    }

    fn tally_tiers(&self, handles: &[ValueHandle], winning: u64) -> Result<TierTally> {
        let mut tally = TierTally::default();
        for handle in handles {
            let value = self
                .values
                .get(handle)
                .ok_or(Error::InvalidCiphertext)?;
            match tier::classify(winning, *value) {
                Tier::Jackpot => tally.jackpot += 1,
                Tier::Silver => tally.silver += 1,
                Tier::Bronze => tally.bronze += 1,
                Tier::None => {}
            }
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(n: u8) -> AccountId {
        AccountId::from_raw([n; 32])
    }

    #[test]
    fn test_register_and_verify() {
        let mut cp = LocalCoprocessor::with_seed(1);
        let (ct, proof) = LocalCoprocessor::encrypt(42, owner(1));
        let handle = cp.validate_and_register(&ct, &proof, owner(1)).unwrap();

        assert!(cp.verify_equals(handle, 42).unwrap());
        assert!(!cp.verify_equals(handle, 43).unwrap());
    }

    #[test]
    fn test_rejects_bad_proof() {
        let mut cp = LocalCoprocessor::with_seed(1);
        let (ct, _) = LocalCoprocessor::encrypt(42, owner(1));
        let err = cp
            .validate_and_register(&ct, &[0u8; 32], owner(1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCiphertext));
    }

    #[test]
    fn test_rejects_proof_bound_to_other_owner() {
        let mut cp = LocalCoprocessor::with_seed(1);
        let (ct, proof) = LocalCoprocessor::encrypt(42, owner(1));
        let err = cp.validate_and_register(&ct, &proof, owner(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidCiphertext));
    }

    #[test]
    fn test_rejects_out_of_range_plaintext() {
        let mut cp = LocalCoprocessor::with_seed(1);
        for bad in [0u64, 101, 1_000] {
            let (ct, proof) = LocalCoprocessor::encrypt(bad, owner(1));
            let err = cp.validate_and_register(&ct, &proof, owner(1)).unwrap_err();
            assert!(matches!(err, Error::InvalidCiphertext));
        }
    }

    #[test]
    fn test_draw_random_in_bounds() {
        let mut cp = LocalCoprocessor::with_seed(7);
        for _ in 0..200 {
            let handle = cp.draw_random(MAX_NUMBER).unwrap();
            let value = cp.decrypt(handle).unwrap();
            assert!((1..=MAX_NUMBER).contains(&value));
        }
    }

    #[test]
    fn test_pending_queue_drains() {
        let mut cp = LocalCoprocessor::with_seed(1);
        let handle = cp.draw_random(MAX_NUMBER).unwrap();
        cp.request_decryption(handle, "R1").unwrap();

        let pending = cp.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].round_id, "R1");
        assert_eq!(pending[0].handle, handle);
        assert!(cp.take_pending().is_empty());
    }

    #[test]
    fn test_tally_tiers() {
        let mut cp = LocalCoprocessor::with_seed(1);
        let mut handles = Vec::new();
        for (i, n) in [50u64, 48, 42, 10].iter().enumerate() {
            let o = owner(i as u8 + 1);
            let (ct, proof) = LocalCoprocessor::encrypt(*n, o);
            handles.push(cp.validate_and_register(&ct, &proof, o).unwrap());
        }

        let tally = cp.tally_tiers(&handles, 50).unwrap();
        assert_eq!(tally.jackpot, 1);
        assert_eq!(tally.silver, 1);
        assert_eq!(tally.bronze, 1);
    }
}
