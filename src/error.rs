use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    /// A configuration mistake: empty topology, k > N, bad percentage, etc.
    /// Never retried.
    Config(String),
    /// All observed labels belong to one class, so ROC/AUC are undefined.
    DegenerateLabels,
    /// A resampling policy could not produce a usable sample: either the
    /// requested size rounds below one item, or the retry cap was exhausted
    /// without drawing a split that contains both classes.
    DegenerateSample(String),
    /// Every repetition failed the AUC gate; the run produced no model.
    AllTrialsFailed { repetitions: usize },
    /// A persisted network failed validation on load, or could not be
    /// written/read.
    InvalidModel(String),
    /// The run was cancelled through its cancellation token.
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "invalid config: {msg}"),
            Error::DegenerateLabels => {
                write!(f, "labels contain a single class; ROC/AUC are undefined")
            }
            Error::DegenerateSample(msg) => write!(f, "degenerate sample: {msg}"),
            Error::AllTrialsFailed { repetitions } => write!(
                f,
                "all {repetitions} repetitions failed the AUC threshold; no model was produced"
            ),
            Error::InvalidModel(msg) => write!(f, "invalid model: {msg}"),
            Error::Cancelled => write!(f, "run cancelled"),
        }
    }
}

impl std::error::Error for Error {}
