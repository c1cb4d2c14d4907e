use log::info;
use ndarray::{Array2, ArrayD, ArrayView4};

use crate::error::Result;
use crate::network::ValueNetwork;

/// Lagged copy of the value network used only to compute TD targets.
///
/// The snapshot owns its own tensors; [`TargetSnapshot::refresh`] copies
/// values over, so later updates to the live network never leak into it.
#[derive(Clone)]
pub struct TargetSnapshot {
    network: ValueNetwork,
    refreshes: usize,
}

impl TargetSnapshot {
    /// Take the initial snapshot of `source`.
    pub fn new(source: &ValueNetwork) -> Self {
        TargetSnapshot {
            network: source.clone(),
            refreshes: 1,
        }
    }

    /// Overwrite the stored parameters with a deep copy of `source`'s current ones.
    pub fn refresh(&mut self, source: &ValueNetwork) -> Result<()> {
        self.network.copy_parameters_from(source)?;
        self.refreshes += 1;
        info!("Refreshed target snapshot ({} refreshes so far)", self.refreshes);
        Ok(())
    }

    /// Action values of the lagged parameters; never part of any backward pass.
    pub fn evaluate(&self, states: ArrayView4<f32>) -> Result<Array2<f32>> {
        self.network.evaluate(states)
    }

    pub fn parameter_values(&self) -> Vec<ArrayD<f32>> {
        self.network.parameter_values()
    }

    /// Number of times the snapshot has been (re)taken, counting construction
    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}
