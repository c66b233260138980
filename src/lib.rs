//! Feed-forward neural network training engine for presence/absence niche
//! modelling.
//!
//! The core loop trains small multi-layer perceptrons with on-line
//! backpropagation over resampled train/test splits, gates the candidate
//! models on ROC AUC, and reports response profiles and variable importance
//! for the models that survive. Runs are seeded and reproducible, can be
//! driven from a background thread, and persist their models as versioned
//! JSON.
//!
//! ```
//! use nichenet::{run, CancelToken, Dataset, NullReporter, TrainOptions};
//!
//! let data = Dataset::from_rows(
//!     &[vec![0.9, 0.8], vec![-0.9, -0.7], vec![0.8, 0.9], vec![-0.7, -0.8]],
//!     &[vec![1.0], vec![0.0], vec![1.0], vec![0.0]],
//! )?;
//! let opts = TrainOptions {
//!     repetitions: 2,
//!     iter_inter: 50,
//!     iter_report: 2,
//!     ..TrainOptions::default()
//! };
//! let report = run(&data, None, &opts, &NullReporter, &CancelToken::new())?;
//! assert_eq!(report.models.len(), 2);
//! # Ok::<(), nichenet::Error>(())
//! ```

mod activation;
mod data;
mod error;
mod network;
mod roc;
mod sensitivity;
mod serde_model;
mod split;
mod train;
mod worker;

pub use activation::Activation;
pub use data::Dataset;
pub use error::{Error, Result};
pub use network::{ErrorKind, Network};
pub use roc::{auc, Roc};
pub use sensitivity::{importance, Analyzer, Profiler, SensitivityReport, VarStats};
pub use serde_model::{model_file_name, SerializedNetwork, MODEL_FORMAT_VERSION};
pub use split::{Bootstrap, KFold, RandomSplits, Split, Splitter};
pub use train::{
    run, suggest_learning_rate, Advisory, AucThresholds, CancelToken, ChosenModel, Method,
    NullReporter, ProgressColor, Reporter, RunReport, TrainOptions, TrialResult,
};
pub use worker::{RunEvent, TrainingHandle};
