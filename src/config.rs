use std::{
    fs,
    net::{Ipv4Addr, SocketAddr},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use comms::ConnectConfig;
use serde::Deserialize;

use crate::Result;

const DEFAULT_PORT: u16 = 2000;

/// One exploration run's configuration, loadable from a JSON file.
///
/// Every field has a default matching the reference behavior, a partial
/// file only overrides what it mentions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// The explorer's endpoint.
    pub endpoint: SocketAddr,
    /// Number of networks to explore.
    pub num_networks: usize,
    /// Maximum squared error for considering an output valid.
    pub threshold: f64,
    /// Where to store and load the trained model.
    pub model_dir: PathBuf,
    /// File name of the trained model inside `model_dir`.
    pub model_name: String,
    /// Requested dataset size; truncated to a perfect square.
    pub dataset_size: usize,
    /// Seed for deterministic runs; absent means seeded from the OS.
    pub seed: Option<u64>,
    pub connect: ConnectSettings,
    pub train: TrainSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            endpoint: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            num_networks: 100,
            threshold: 0.5,
            model_dir: PathBuf::from(".models/bnn_expl"),
            model_name: "bnn.safetensors".to_string(),
            dataset_size: 1024,
            seed: None,
            connect: ConnectSettings::default(),
            train: TrainSettings::default(),
        }
    }
}

impl RunConfig {
    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Path of the trained probabilistic model.
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_name)
    }

    /// Directory holding the per-round concrete networks.
    pub fn ensemble_dir(&self) -> PathBuf {
        self.model_dir.join("ensemble")
    }
}

/// Connect-phase settings as they appear in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectSettings {
    /// Transport connect attempts; 0 retries forever.
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    /// Attempt exactly once instead of retrying.
    pub fail_fast: bool,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay_ms: 100,
            fail_fast: false,
        }
    }
}

impl ConnectSettings {
    pub fn to_config(&self) -> ConnectConfig {
        ConnectConfig {
            max_attempts: NonZeroUsize::new(self.max_attempts),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            fail_fast: self.fail_fast,
        }
    }
}

/// Training settings as they appear in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainSettings {
    pub epochs: usize,
    pub batch_size: NonZeroUsize,
    pub kl_weight: f64,
    pub learning_rate: f64,
}

impl Default for TrainSettings {
    fn default() -> Self {
        let defaults = bnn::TrainConfig::default();
        Self {
            epochs: defaults.epochs,
            batch_size: defaults.batch_size,
            kl_weight: defaults.kl_weight,
            learning_rate: defaults.learning_rate,
        }
    }
}

impl TrainSettings {
    pub fn to_config(&self) -> bnn::TrainConfig {
        bnn::TrainConfig {
            epochs: self.epochs,
            batch_size: self.batch_size,
            kl_weight: self.kl_weight,
            learning_rate: self.learning_rate,
            ..bnn::TrainConfig::default()
        }
    }
}
