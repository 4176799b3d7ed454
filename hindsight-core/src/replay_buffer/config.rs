//! Configurations of the replay buffers.
//!
//! Only configuration is ever persisted: buffer contents and priority trees
//! are rebuilt empty when an agent is reloaded.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Selects how stored transitions are prioritized for sampling.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriorityMode {
    /// Sampling probability proportional to the stored priority value,
    /// resolved through a sum tree.
    Proportional,

    /// Sampling probability proportional to `1 / rank^alpha` over a lazily
    /// maintained descending sort of the priorities.
    Rank,
}

/// Configuration of prioritized sampling.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PerConfig {
    /// Priority exponent; sharper prioritization with higher values.
    pub alpha: f32,

    /// Initial value of the importance-sampling exponent.
    pub beta_0: f32,

    /// Final value of the importance-sampling exponent, typically `1.0`.
    pub beta_final: f32,

    /// Optimization steps at which `beta` reaches its final value.
    pub n_opts_final: usize,

    /// Prioritization strategy.
    pub mode: PriorityMode,

    /// Priority floor, keeps every stored transition sampleable.
    pub epsilon: f32,
}

impl Default for PerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_final: 1.0,
            n_opts_final: 100_000,
            mode: PriorityMode::Proportional,
            epsilon: 1e-6,
        }
    }
}

impl PerConfig {
    /// Sets the priority exponent.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance-sampling exponent.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the final importance-sampling exponent.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the number of optimization steps over which `beta` anneals.
    pub fn n_opts_final(mut self, n_opts_final: usize) -> Self {
        self.n_opts_final = n_opts_final;
        self
    }

    /// Sets the prioritization strategy.
    pub fn mode(mut self, mode: PriorityMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the priority floor.
    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Configuration of [`ReplayBuffer`](super::ReplayBuffer).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ReplayBufferConfig {
    /// Maximum number of stored transitions. When the buffer is full, new
    /// transitions overwrite the oldest ones.
    pub capacity: usize,

    /// Seed of the sampling stream.
    pub seed: u64,

    /// Shape of the goal vectors; `None` disables the goal columns.
    pub goal_shape: Option<Vec<usize>>,

    /// Device tag recorded for the consumer of sampled batches. The buffer
    /// itself always keeps its storage in host memory.
    pub device: Option<String>,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            seed: 42,
            goal_shape: None,
            device: None,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the seed of the sampling stream.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables goal columns with the given goal vector shape.
    pub fn goal_shape(mut self, goal_shape: Option<Vec<usize>>) -> Self {
        self.goal_shape = goal_shape;
        self
    }

    /// Sets the recorded device tag.
    pub fn device(mut self, device: Option<String>) -> Self {
        self.device = device;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Configuration of [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct PrioritizedReplayBufferConfig {
    /// Storage configuration, shared with the uniform buffer.
    pub base: ReplayBufferConfig,

    /// Prioritized sampling parameters.
    pub per: PerConfig,
}

impl PrioritizedReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.base.capacity = capacity;
        self
    }

    /// Sets the seed of the sampling stream.
    pub fn seed(mut self, seed: u64) -> Self {
        self.base.seed = seed;
        self
    }

    /// Enables goal columns with the given goal vector shape.
    pub fn goal_shape(mut self, goal_shape: Option<Vec<usize>>) -> Self {
        self.base.goal_shape = goal_shape;
        self
    }

    /// Sets the prioritized sampling parameters.
    pub fn per(mut self, per: PerConfig) -> Self {
        self.per = per;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
