//! Runs a list of probes and merges their content into one report

use std::sync::Arc;

use futures::future::join_all;
use hostinv_inventory::{Content, Probe, probes};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::config::{ExecutionMode, Profile};
use crate::error::CoreError;
use crate::report::{Outcome, ReportEnvelope, ReturnBody};
use crate::task::{ProbeOutcome, ProbeRunner, ProbeTask};

/// Capability name of the aggregate report
pub const SYSTEM_CAPABILITY: &str = "win_system_get_statistics";

impl Profile {
    /// Probes covered by this profile, in collection order
    #[must_use]
    pub fn probes(self) -> Vec<Arc<dyn Probe>> {
        match self {
            Self::System => probes::catalogue(),
            Self::Hardware => probes::hardware(),
        }
    }
}

/// Merged result of one orchestrated run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub content: Content,
    /// `<probe>: <message>` for every failed probe or worker
    pub failures: Vec<String>,
}

impl Aggregate {
    /// Fold one probe's body in; later keys overwrite earlier ones
    fn merge(&mut self, outcome: ProbeOutcome) {
        if outcome.body.outcome == Outcome::Failed {
            self.failures.extend(
                outcome
                    .body
                    .messages
                    .iter()
                    .map(|message| format!("{}: {message}", outcome.probe)),
            );
        }
        self.content.extend(outcome.body.content);
    }
}

/// Drives every probe of a run and builds the aggregate report
pub struct ProbeOrchestrator {
    runner: Arc<ProbeRunner>,
    probes: Vec<Arc<dyn Probe>>,
    mode: ExecutionMode,
}

impl ProbeOrchestrator {
    #[must_use]
    pub fn new(runner: ProbeRunner, probes: Vec<Arc<dyn Probe>>, mode: ExecutionMode) -> Self {
        Self {
            runner: Arc::new(runner),
            probes,
            mode,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Collect every probe and merge the results
    pub async fn collect(&self, host: &str) -> Aggregate {
        match self.mode {
            ExecutionMode::Sequential => self.collect_sequential(host).await,
            ExecutionMode::Concurrent => self.collect_concurrent(host).await,
        }
    }

    /// Collect, then persist and return the aggregate envelope
    ///
    /// The aggregate is `Successful` whenever the run completes; individual
    /// probe failures surface as messages.
    #[instrument(skip(self), fields(mode = ?self.mode, probes = self.probes.len()))]
    pub async fn run(&self, host: &str) -> ReturnBody {
        let mut envelope = ReportEnvelope::new(SYSTEM_CAPABILITY, host, self.runner.settings());
        let aggregate = self.collect(host).await;

        info!(
            keys = aggregate.content.len(),
            failures = aggregate.failures.len(),
            "run complete"
        );

        envelope.content = aggregate.content;
        envelope.messages = aggregate.failures;
        envelope.outcome = Outcome::Successful;
        envelope.finalize_and_persist()
    }

    async fn collect_sequential(&self, host: &str) -> Aggregate {
        let mut aggregate = Aggregate::default();
        for probe in &self.probes {
            let task = ProbeTask::inline(Arc::clone(probe));
            let body = self.runner.invoke(&task, host, None).await;
            aggregate.merge(ProbeOutcome {
                probe: task.name().to_string(),
                body,
            });
        }
        aggregate
    }

    async fn collect_concurrent(&self, host: &str) -> Aggregate {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let (names, handles): (Vec<_>, Vec<_>) = self
            .probes
            .iter()
            .map(|probe| {
                let task = ProbeTask::threaded(Arc::clone(probe));
                let runner = Arc::clone(&self.runner);
                let tx = tx.clone();
                let host = host.to_string();
                let name = task.name();
                let handle = tokio::spawn(async move {
                    runner.invoke(&task, &host, Some(&tx)).await;
                });
                (name, handle)
            })
            .unzip();
        drop(tx);

        let mut aggregate = Aggregate::default();

        // Barrier: every worker has finished before the queue is read.
        for (name, joined) in names.into_iter().zip(join_all(handles).await) {
            if let Err(err) = joined {
                let err = CoreError::WorkerPanicked(err.to_string());
                warn!(probe = name, error = %err, "worker did not report");
                aggregate.failures.push(format!("{name}: {err}"));
            }
        }

        while let Ok(outcome) = rx.try_recv() {
            aggregate.merge(outcome);
        }

        aggregate
    }
}

impl std::fmt::Debug for ProbeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeOrchestrator")
            .field("probes", &self.probes.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(outcome: Outcome, messages: &[&str], content: serde_json::Value) -> ReturnBody {
        ReturnBody {
            outcome,
            messages: messages.iter().map(|m| (*m).to_string()).collect(),
            content: content.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_merge_later_wins() {
        let mut aggregate = Aggregate::default();
        aggregate.merge(ProbeOutcome {
            probe: "a".to_string(),
            body: body(Outcome::Successful, &[], json!({"k": 1, "a": true})),
        });
        aggregate.merge(ProbeOutcome {
            probe: "b".to_string(),
            body: body(Outcome::Successful, &[], json!({"k": 2})),
        });

        assert_eq!(aggregate.content["k"], json!(2));
        assert_eq!(aggregate.content["a"], json!(true));
        assert!(aggregate.failures.is_empty());
    }

    #[test]
    fn test_merge_failure_prefixes_messages() {
        let mut aggregate = Aggregate::default();
        aggregate.merge(ProbeOutcome {
            probe: "services".to_string(),
            body: body(Outcome::Failed, &["probe failed: access denied"], json!({})),
        });

        assert_eq!(aggregate.failures, vec!["services: probe failed: access denied"]);
        assert!(aggregate.content.is_empty());
    }

    #[test]
    fn test_successful_messages_not_failures() {
        let mut aggregate = Aggregate::default();
        aggregate.merge(ProbeOutcome {
            probe: "bios".to_string(),
            body: body(Outcome::Successful, &["Error with logging procedure"], json!({"bios": {}})),
        });

        assert!(aggregate.failures.is_empty());
        assert_eq!(aggregate.content["bios"], json!({}));
    }

    #[test]
    fn test_profile_probe_lists() {
        assert_eq!(Profile::System.probes().len(), 11);
        assert_eq!(Profile::Hardware.probes().len(), 5);
    }
}
