//! Scoring pipeline interface.
//!
//! `submit` enqueues a candidate and returns the reply handle immediately;
//! the HTTP handler awaits it on its own task, so a slow scorer stalls only
//! the one request that is waiting on it.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::miner::{deadline_format, MinerState};

/// A candidate nonce handed to the scoring pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionCandidate {
    pub nonce: u64,
    pub account_id: u64,
    pub deadline: u64,
    pub height: u64,
    pub plot_id: String,
}

/// Verdict for one candidate, as a fully formed JSON body that is relayed
/// to the submitting miner verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub json: String,
}

/// One queued unit of scoring work.
#[derive(Debug)]
pub struct SubmissionJob {
    pub candidate: SubmissionCandidate,
    pub reply: oneshot::Sender<SubmissionOutcome>,
}

/// Sending half of the scoring pipeline, cloned into every request worker.
#[derive(Debug, Clone)]
pub struct SubmissionPipeline {
    jobs: mpsc::UnboundedSender<SubmissionJob>,
}

impl SubmissionPipeline {
    /// Create the pipeline and the job stream its scorer consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SubmissionJob>) {
        let (jobs, rx) = mpsc::unbounded_channel();
        (Self { jobs }, rx)
    }

    /// Enqueue a candidate and return the reply handle without waiting.
    ///
    /// If the scorer is gone the returned receiver resolves to an error,
    /// which the caller reports as a dropped submission.
    pub fn submit(&self, candidate: SubmissionCandidate) -> oneshot::Receiver<SubmissionOutcome> {
        let (reply, rx) = oneshot::channel();
        if let Err(e) = self.jobs.send(SubmissionJob { candidate, reply }) {
            tracing::error!(
                nonce = e.0.candidate.nonce,
                "Scoring pipeline is gone, submission dropped"
            );
        }
        rx
    }
}

/// Baseline scorer: confirms every candidate for the current block and
/// tracks the best deadline per height.
///
/// A full mining core replaces this with its own consumer of the job
/// stream; the reply contract is the same.
pub fn spawn_best_deadline_scorer(
    mut jobs: mpsc::UnboundedReceiver<SubmissionJob>,
    state: MinerState,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut best_by_height: HashMap<u64, u64> = HashMap::new();

        while let Some(job) = jobs.recv().await {
            let candidate = job.candidate;
            let current_height = state.height();

            let json = if candidate.height != current_height {
                tracing::debug!(
                    submitted = candidate.height,
                    current = current_height,
                    "Candidate is for a stale block"
                );
                serde_json::json!({
                    "result": "failure",
                    "reason": "block already passed",
                })
                .to_string()
            } else {
                let best = best_by_height
                    .entry(candidate.height)
                    .or_insert(u64::MAX);
                if candidate.deadline < *best {
                    *best = candidate.deadline;
                    tracing::info!(
                        height = candidate.height,
                        deadline = %deadline_format(candidate.deadline),
                        account = candidate.account_id,
                        "New best deadline"
                    );
                }
                serde_json::json!({
                    "result": "success",
                    "deadline": candidate.deadline,
                })
                .to_string()
            };

            best_by_height.retain(|height, _| *height + 2 > current_height);

            // The requester may have timed out and gone away.
            let _ = job.reply.send(SubmissionOutcome { json });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::MiningInfo;

    fn state_at(height: u64) -> MinerState {
        MinerState::new(MiningInfo {
            base_target: 1,
            generation_signature: String::new(),
            target_deadline: 86_400,
            height,
        })
    }

    fn candidate(height: u64, deadline: u64) -> SubmissionCandidate {
        SubmissionCandidate {
            nonce: 456,
            account_id: 123,
            deadline,
            height,
            plot_id: "unknown".into(),
        }
    }

    #[tokio::test]
    async fn test_submit_resolves_with_scorer_verdict() {
        let (pipeline, jobs) = SubmissionPipeline::channel();
        let scorer = spawn_best_deadline_scorer(jobs, state_at(7));

        let outcome = pipeline.submit(candidate(7, 789)).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&outcome.json).unwrap();
        assert_eq!(value["result"], "success");
        assert_eq!(value["deadline"], 789);

        scorer.abort();
    }

    #[tokio::test]
    async fn test_stale_height_is_rejected() {
        let (pipeline, jobs) = SubmissionPipeline::channel();
        let scorer = spawn_best_deadline_scorer(jobs, state_at(8));

        let outcome = pipeline.submit(candidate(7, 789)).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&outcome.json).unwrap();
        assert_eq!(value["result"], "failure");

        scorer.abort();
    }

    #[tokio::test]
    async fn test_submit_after_scorer_gone_resolves_to_error() {
        let (pipeline, jobs) = SubmissionPipeline::channel();
        drop(jobs);

        assert!(pipeline.submit(candidate(7, 789)).await.is_err());
    }
}
