use std::fs;
use std::path::Path;

use log::info;
use ndarray::ArrayD;
use serde::{Serialize, Deserialize};

use super::learner::Learner;
use crate::error::Result;

/// Everything needed to resume learning, minus the optimizer accumulators
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ParameterCheckpoint {
    /// Value network tensors, convolutions first, in parameter order
    pub value: Vec<ArrayD<f32>>,
    pub autoencoder: Vec<ArrayD<f32>>,
    pub update_counter: usize,
    pub max_compression_loss: f32,
}

impl Learner {
    pub fn checkpoint(&self) -> ParameterCheckpoint {
        let (value, autoencoder) = self.parameter_state();
        ParameterCheckpoint {
            value,
            autoencoder,
            update_counter: self.update_counter(),
            max_compression_loss: self.max_compression_loss(),
        }
    }

    /// Restore a checkpoint taken from a learner with the same topology.
    ///
    /// The target snapshot, if any, is refreshed from the restored parameters.
    pub fn restore(&mut self, checkpoint: &ParameterCheckpoint) -> Result<()> {
        self.restore_parameter_state(
            &checkpoint.value,
            &checkpoint.autoencoder,
            checkpoint.update_counter,
            checkpoint.max_compression_loss,
        )
    }

    pub fn save_parameters<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(&self.checkpoint())?;
        fs::write(path.as_ref(), serialized)?;
        info!("Saved parameters after {} updates to {}", self.update_counter(), path.as_ref().display());
        Ok(())
    }

    pub fn load_parameters<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let data = fs::read(path.as_ref())?;
        let checkpoint: ParameterCheckpoint = bincode::deserialize(&data)?;
        self.restore(&checkpoint)?;
        info!("Loaded parameters from {} ({} updates)", path.as_ref().display(), checkpoint.update_counter);
        Ok(())
    }
}
