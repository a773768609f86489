//! Runtime configuration and snapshot publication.
//!
//! The seed is resolved once at process start: an explicit host override
//! first, then the `BINGO_SEED` environment variable. When a usable seed is
//! found, board generation draws from a generator seeded with it so shuffles
//! reproduce exactly; otherwise generation uses entropy.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::store::PersistedState;

/// Version tag carried by published snapshots.
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Environment variable naming the deterministic seed.
pub const SEED_ENV_VAR: &str = "BINGO_SEED";

/// Process-wide generation configuration, immutable after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub deterministic: bool,
    pub seed: Option<u32>,
    pub seed_source: Option<String>,
}

impl RuntimeConfig {
    /// Resolve from an optional host override, then the environment.
    pub fn resolve(override_seed: Option<&str>) -> Self {
        if let Some(raw) = override_seed {
            if let Some(seed) = coerce_seed(raw) {
                return Self::from_seed(seed, "override");
            }
        }
        Self::from_env()
    }

    /// Resolve from the `BINGO_SEED` environment variable alone.
    pub fn from_env() -> Self {
        match std::env::var(SEED_ENV_VAR) {
            Ok(raw) => match coerce_seed(&raw) {
                Some(seed) => Self::from_seed(seed, &format!("env:{}", SEED_ENV_VAR)),
                None => Self::non_deterministic(),
            },
            Err(_) => Self::non_deterministic(),
        }
    }

    /// Deterministic configuration with a known seed.
    pub fn from_seed(seed: u32, source: &str) -> Self {
        Self {
            deterministic: true,
            seed: Some(seed),
            seed_source: Some(source.to_string()),
        }
    }

    /// Configuration using the platform random source.
    pub fn non_deterministic() -> Self {
        Self {
            deterministic: false,
            seed: None,
            seed_source: None,
        }
    }

    /// Random generator for board shuffles: seeded when deterministic,
    /// entropy-backed otherwise.
    pub fn board_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed as u64),
            None => StdRng::from_entropy(),
        }
    }
}

/// The process-wide configuration, resolved from the environment on first
/// access and immutable afterwards. Hosts that need an override should keep
/// an explicit [`RuntimeConfig`] value instead.
pub fn runtime_config() -> &'static RuntimeConfig {
    static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();
    CONFIG.get_or_init(RuntimeConfig::from_env)
}

/// Coerce a raw seed string to an unsigned 32-bit seed.
///
/// Decimal and `0x`-prefixed hex values are truncated to u32; any other
/// non-empty string is hashed with FNV-1a.
fn coerce_seed(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if let Ok(value) = u128::from_str_radix(hex, 16) {
            return Some(value as u32);
        }
    }

    if let Ok(value) = trimmed.parse::<i128>() {
        return Some(value as u32);
    }

    Some(fnv1a_32(trimmed))
}

/// FNV-1a over the string's bytes, 32-bit.
pub fn fnv1a_32(value: &str) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for byte in value.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}

/// A published debug/inspection snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    pub version: String,
    pub deterministic: bool,
    pub seed: Option<u32>,
    pub seed_source: Option<String>,
    pub state: Option<PersistedState>,
}

type Observer = Box<dyn FnMut(&RuntimeSnapshot)>;

/// Host-owned snapshot publication.
///
/// The host decides whether to construct a publisher and which observers
/// see snapshots; nothing is published through process globals. Observer
/// failures are isolated the same way as store event handlers.
pub struct SnapshotPublisher {
    config: RuntimeConfig,
    observers: Vec<Observer>,
    latest: Option<RuntimeSnapshot>,
}

impl SnapshotPublisher {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            observers: Vec::new(),
            latest: None,
        }
    }

    /// Register an observer for future snapshots.
    pub fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(&RuntimeSnapshot) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Publish a snapshot of the current state to every observer.
    pub fn publish(&mut self, state: Option<PersistedState>) -> &RuntimeSnapshot {
        let snapshot = RuntimeSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            deterministic: self.config.deterministic,
            seed: self.config.seed,
            seed_source: self.config.seed_source.clone(),
            state,
        };

        for observer in self.observers.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| observer(&snapshot))).is_err() {
                tracing::error!("snapshot observer panicked");
            }
        }

        &*self.latest.insert(snapshot)
    }

    /// The most recently published snapshot, if any.
    pub fn latest(&self) -> Option<&RuntimeSnapshot> {
        self.latest.as_ref()
    }
}

impl fmt::Debug for SnapshotPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotPublisher")
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .field("latest", &self.latest)
            .finish()
    }
}
