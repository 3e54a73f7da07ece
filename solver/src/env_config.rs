//! Engine configuration: solver limits and worker count.
//!
//! Defaults come from [`crate::constants`]. [`EngineConfig::from_env`] overrides them
//! from environment variables; [`EngineConfig::from_json`] from a JSON document in
//! which every field is optional.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `EGT_STATE_LIMIT` | `state_limit` |
//! | `EGT_DENSE_LIMIT` | `dense_limit` |
//! | `EGT_BAND_LIMIT` | `band_limit` |
//! | `EGT_STATIONARY_CHAINS` | `stationary_chains` |
//! | `RAYON_NUM_THREADS` | `num_threads` |

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::*;
use crate::error::{EgtError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest state space the exact analyzer accepts (inclusive).
    pub state_limit: usize,
    /// Largest state space solved with dense LU; larger ones use banded elimination.
    pub dense_limit: usize,
    /// Most band entries banded elimination may allocate.
    pub band_limit: usize,
    /// Independent chains used by the Monte Carlo stationary estimate.
    pub stationary_chains: usize,
    /// Rayon worker count; `None` leaves rayon's default.
    pub num_threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_limit: DEFAULT_STATE_LIMIT,
            dense_limit: DEFAULT_DENSE_LIMIT,
            band_limit: DEFAULT_BAND_LIMIT,
            stationary_chains: DEFAULT_STATIONARY_CHAINS,
            num_threads: None,
        }
    }
}

fn env_override<T: FromStr>(name: &str, target: &mut T) {
    let Ok(raw) = std::env::var(name) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => warn!(variable = name, value = %raw, "ignoring unparsable environment override"),
    }
}

impl EngineConfig {
    /// Defaults with environment overrides applied. Unparsable values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        env_override(ENV_STATE_LIMIT, &mut config.state_limit);
        env_override(ENV_DENSE_LIMIT, &mut config.dense_limit);
        env_override(ENV_BAND_LIMIT, &mut config.band_limit);
        env_override(ENV_STATIONARY_CHAINS, &mut config.stationary_chains);
        let mut threads = 0usize;
        env_override(ENV_NUM_THREADS, &mut threads);
        if threads > 0 {
            config.num_threads = Some(threads);
        }
        config
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EgtError::invalid("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EgtError::InvariantViolation(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.state_limit == 0 {
            return Err(EgtError::invalid("state_limit", "must be positive"));
        }
        if self.band_limit == 0 {
            return Err(EgtError::invalid("band_limit", "must be positive"));
        }
        if self.stationary_chains == 0 {
            return Err(EgtError::invalid("stationary_chains", "must be positive"));
        }
        Ok(())
    }

    pub fn with_state_limit(mut self, state_limit: usize) -> Self {
        self.state_limit = state_limit;
        self
    }

    pub fn with_dense_limit(mut self, dense_limit: usize) -> Self {
        self.dense_limit = dense_limit;
        self
    }

    pub fn with_band_limit(mut self, band_limit: usize) -> Self {
        self.band_limit = band_limit;
        self
    }

    pub fn with_stationary_chains(mut self, stationary_chains: usize) -> Self {
        self.stationary_chains = stationary_chains;
        self
    }

    /// Build the global rayon pool with `num_threads` workers. Tolerates a pool that
    /// is already initialized. Returns the number of workers in use.
    #[cfg(feature = "parallel")]
    pub fn init_rayon_threads_lenient(&self) -> usize {
        if let Some(num_threads) = self.num_threads {
            if rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .is_err()
            {
                warn!(num_threads, "rayon pool already initialized");
            }
        }
        let in_use = rayon::current_num_threads();
        info!(threads = in_use, "rayon pool ready");
        in_use
    }

    #[cfg(not(feature = "parallel"))]
    pub fn init_rayon_threads_lenient(&self) -> usize {
        1
    }
}
