//! Configuration of hindsight goal relabeling.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Selects which achieved goals are substituted for the desired goal.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalStrategy {
    /// Relabel every step with the last achieved goal of the episode.
    Final,

    /// Relabel each step with goals achieved at random later steps of the
    /// same episode, up to `num_goals` per step.
    Future,

    /// Store nothing; used when hindsight replay is disabled but the
    /// trajectory code path is shared.
    None,
}

/// Configuration of the hindsight trajectory relay.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct HerConfig {
    /// Goal relabeling strategy.
    pub strategy: GoalStrategy,

    /// Distance tolerance handed to the reward function.
    pub tolerance: f32,

    /// Number of future goals drawn per step under
    /// [`GoalStrategy::Future`].
    pub num_goals: usize,
}

impl Default for HerConfig {
    fn default() -> Self {
        Self {
            strategy: GoalStrategy::Final,
            tolerance: 0.5,
            num_goals: 4,
        }
    }
}

impl HerConfig {
    /// Sets the relabeling strategy.
    pub fn strategy(mut self, strategy: GoalStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the goal tolerance.
    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the number of future goals drawn per step.
    pub fn num_goals(mut self, num_goals: usize) -> Self {
        self.num_goals = num_goals;
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
