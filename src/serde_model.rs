//! Model persistence.
//!
//! A trained [`Network`] serializes to a versioned JSON document carrying
//! the topology, hyperparameters, weights and momentum buffers, so a
//! reloaded model both predicts identically and can resume training.
//! Every load path revalidates the document before a network is built.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Network, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// On-disk form of a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedNetwork {
    pub format_version: u32,
    pub topology: Vec<usize>,
    pub activation: Activation,
    pub learning_rate: f64,
    pub momentum: f64,
    pub iterations: usize,
    /// Per layer, row-major with the bias as the last column of each row.
    pub weights: Vec<Vec<f64>>,
    pub changes: Vec<Vec<f64>>,
}

impl SerializedNetwork {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidModel(format!(
                "unsupported format version {} (expected {MODEL_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.topology.len() < 2 {
            return Err(Error::InvalidModel(
                "topology must include input and output sizes".to_owned(),
            ));
        }
        if self.topology.contains(&0) {
            return Err(Error::InvalidModel("topology contains a zero layer".to_owned()));
        }
        let layers = self.topology.len() - 1;
        if self.weights.len() != layers || self.changes.len() != layers {
            return Err(Error::InvalidModel(format!(
                "expected {layers} weight layers, got {} weights / {} changes",
                self.weights.len(),
                self.changes.len()
            )));
        }
        for (l, w) in self.topology.windows(2).enumerate() {
            let expected = w[1] * (w[0] + 1);
            if self.weights[l].len() != expected || self.changes[l].len() != expected {
                return Err(Error::InvalidModel(format!(
                    "layer {l} should hold {expected} values, got {} weights / {} changes",
                    self.weights[l].len(),
                    self.changes[l].len()
                )));
            }
        }
        if !self.learning_rate.is_finite() || !self.momentum.is_finite() {
            return Err(Error::InvalidModel(
                "hyperparameters must be finite".to_owned(),
            ));
        }
        for (l, layer) in self.weights.iter().chain(&self.changes).enumerate() {
            if layer.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidModel(format!(
                    "parameter buffer {l} contains a non-finite value"
                )));
            }
        }
        Ok(())
    }
}

impl From<&Network> for SerializedNetwork {
    fn from(net: &Network) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            topology: net.topology().to_vec(),
            activation: net.activation(),
            learning_rate: net.learning_rate,
            momentum: net.momentum,
            iterations: net.iterations,
            weights: net.weight_layers().to_vec(),
            changes: net.change_layers().to_vec(),
        }
    }
}

impl TryFrom<SerializedNetwork> for Network {
    type Error = Error;

    fn try_from(model: SerializedNetwork) -> Result<Self> {
        model.validate()?;
        Network::from_parts(
            model.topology,
            model.activation,
            model.weights,
            model.changes,
            model.learning_rate,
            model.momentum,
            model.iterations,
        )
    }
}

impl Network {
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&SerializedNetwork::from(self))
            .map_err(|e| Error::InvalidModel(format!("serialization failed: {e}")))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: SerializedNetwork = serde_json::from_str(json)
            .map_err(|e| Error::InvalidModel(format!("malformed model JSON: {e}")))?;
        Self::try_from(model)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string_pretty()?;
        fs::write(path, json)
            .map_err(|e| Error::InvalidModel(format!("cannot write {}: {e}", path.display())))
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| Error::InvalidModel(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}

/// File name a retained model is saved under: the reported training
/// iteration it was taken at and the repetition that produced it.
pub fn model_file_name(iteration: usize, repetition: usize) -> String {
    format!("net{iteration}_rep{repetition}.json")
}
