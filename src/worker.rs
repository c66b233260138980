//! Background training thread.
//!
//! A run can take minutes, so interactive callers spawn it on its own
//! thread and watch a channel of [`RunEvent`]s. The [`TrainingHandle`]
//! owns the thread, the receiving end of the channel and a cancellation
//! token; dropping the handle cancels the run and joins the thread.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use crate::sensitivity::Profiler;
use crate::train::{
    self, CancelToken, ProgressColor, Reporter, RunReport, TrainOptions, TrialResult,
};
use crate::{Dataset, Error, Result};

/// Progress stream of a background run.
#[derive(Debug)]
pub enum RunEvent {
    Progress {
        step: usize,
        total: usize,
        message: String,
        color: ProgressColor,
    },
    Text(String),
    Trial {
        repetition: usize,
        result: TrialResult,
    },
    /// Always the last event sent.
    Finished(Result<RunReport>),
}

/// Forwards [`Reporter`] callbacks onto a channel. Send failures mean the
/// receiver is gone and are ignored; the run itself stops through its
/// cancellation token.
struct ChannelReporter {
    tx: Sender<RunEvent>,
}

impl Reporter for ChannelReporter {
    fn progress(&self, step: usize, total: usize, message: &str, color: ProgressColor) {
        let _ = self.tx.send(RunEvent::Progress {
            step,
            total,
            message: message.to_owned(),
            color,
        });
    }

    fn text(&self, message: &str) {
        let _ = self.tx.send(RunEvent::Text(message.to_owned()));
    }

    fn trial(&self, repetition: usize, result: &TrialResult) {
        let _ = self.tx.send(RunEvent::Trial {
            repetition,
            result: *result,
        });
    }
}

pub struct TrainingHandle {
    thread: Option<JoinHandle<()>>,
    events: Receiver<RunEvent>,
    cancel: CancelToken,
}

impl TrainingHandle {
    /// Start a run on a new thread. The data and options move into the
    /// thread; progress comes back through [`TrainingHandle::try_recv`].
    pub fn spawn(data: Dataset, profiler: Option<Profiler>, opts: TrainOptions) -> Self {
        let (tx, events) = std::sync::mpsc::channel();
        let cancel = CancelToken::new();
        let run_cancel = cancel.clone();

        let thread = std::thread::spawn(move || {
            let reporter = ChannelReporter { tx: tx.clone() };
            let result = train::run(&data, profiler.as_ref(), &opts, &reporter, &run_cancel);
            let _ = tx.send(RunEvent::Finished(result));
        });

        Self {
            thread: Some(thread),
            events,
            cancel,
        }
    }

    /// Non-blocking poll for the next event.
    pub fn try_recv(&self) -> Option<RunEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Ask the run to stop; it finishes with [`Error::Cancelled`] at the
    /// next snapshot boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the run finishes and return its outcome.
    pub fn wait(mut self) -> Result<RunReport> {
        let mut outcome = Err(Error::Cancelled);
        while let Ok(event) = self.events.recv() {
            if let RunEvent::Finished(result) = event {
                outcome = result;
                break;
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        outcome
    }
}

impl Drop for TrainingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
