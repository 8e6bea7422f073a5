//! # Juror Selection
//!
//! Draws a panel by weighted random sampling without replacement, using the
//! Efraimidis-Spirakis method: every candidate gets the key `u^(1/w)` for a
//! uniform `u` in (0, 1], and the `k` largest keys win. The weight of a
//! juror is `reputation + 1`, so it grows with reputation and is never zero.
//!
//! ## Randomness and Replay
//!
//! A [`RandomnessSource`] supplies 32 bytes of entropy per draw. The seed is
//! `SHA-256(entropy ‖ context)`, where the context binds the dispute id,
//! policy and claimant. The seed drives `StdRng` and is recorded on the
//! dispute. Candidates are visited in address order, so an auditor with the
//! seed and the registry snapshot reproduces the panel exactly.

use std::sync::Arc;

use jury_core::{JurorAddress, JuryError};
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};

use crate::registry::JurorRegistry;

/// Source of per-draw entropy.
pub trait RandomnessSource: Send + Sync {
    /// 32 fresh bytes of entropy.
    fn entropy(&self) -> [u8; 32];
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomness;

impl RandomnessSource for OsRandomness {
    fn entropy(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }
}

/// Constant entropy, for tests, simulations and replaying a recorded draw.
///
/// Draws still differ between disputes because the context is hashed into
/// the seed.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandomness([u8; 32]);

impl FixedRandomness {
    pub fn new(entropy: [u8; 32]) -> Self {
        Self(entropy)
    }

    /// Entropy derived from a numeric seed.
    pub fn from_seed(seed: u64) -> Self {
        let digest = Sha256::digest(seed.to_be_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}

impl RandomnessSource for FixedRandomness {
    fn entropy(&self) -> [u8; 32] {
        self.0
    }
}

/// A drawn panel and the seed that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSelection {
    /// Panel members, in draw order.
    pub jurors: Vec<JurorAddress>,
    /// PRNG seed.
    pub seed: [u8; 32],
}

impl PanelSelection {
    /// The seed as lowercase hex.
    pub fn seed_hex(&self) -> String {
        self.seed.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Derive the PRNG seed for a draw.
pub fn derive_seed(entropy: &[u8; 32], context: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entropy);
    hasher.update(context);
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&hasher.finalize());
    seed
}

/// Sample `k` distinct candidates weighted by `reputation + 1`.
///
/// Returns fewer than `k` only if there are fewer candidates; callers check.
pub fn weighted_sample<R: Rng + ?Sized>(
    candidates: &[(JurorAddress, u64)],
    k: usize,
    rng: &mut R,
) -> Vec<JurorAddress> {
    let mut keyed: Vec<(f64, &JurorAddress)> = candidates
        .iter()
        .map(|(address, reputation)| {
            let weight = *reputation as f64 + 1.0;
            // 1 - [0, 1) keeps u away from zero.
            let u: f64 = 1.0 - rng.gen::<f64>();
            // ln(u^(1/w)) orders identically to u^(1/w) and stays finite.
            (u.ln() / weight, address)
        })
        .collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
    keyed.into_iter().take(k).map(|(_, a)| a.clone()).collect()
}

/// Draws panels from the registry.
pub struct JurorSelector {
    registry: Arc<JurorRegistry>,
    source: Arc<dyn RandomnessSource>,
}

impl JurorSelector {
    pub fn new(registry: Arc<JurorRegistry>, source: Arc<dyn RandomnessSource>) -> Self {
        Self { registry, source }
    }

    /// Draw `target_size` distinct eligible jurors, never `exclude`.
    ///
    /// # Errors
    ///
    /// [`JuryError::InsufficientJurors`] when fewer than `target_size`
    /// eligible jurors exist. The panel is never shrunk to fit.
    pub fn select_panel(
        &self,
        exclude: &JurorAddress,
        target_size: usize,
        context: &[u8],
    ) -> Result<PanelSelection, JuryError> {
        let candidates = self.registry.candidates(exclude);
        if candidates.len() < target_size {
            return Err(JuryError::InsufficientJurors {
                required: target_size,
                available: candidates.len(),
            });
        }
        let seed = derive_seed(&self.source.entropy(), context);
        let mut rng = StdRng::from_seed(seed);
        let jurors = weighted_sample(&candidates, target_size, &mut rng);
        Ok(PanelSelection { jurors, seed })
    }
}
