//! One probe run: envelope, interface, session and outcome

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use hostinv_exec::{InterfaceFactory, SessionGuard};
use hostinv_inventory::{Content, Probe};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::config::ReportSettings;
use crate::error::CoreError;
use crate::handler::handle_error;
use crate::report::{Outcome, ReportEnvelope, ReturnBody};

/// What a threaded worker forwards to the completion queue
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// Short name of the probe
    pub probe: String,
    /// Finalized body, successful or failed
    pub body: ReturnBody,
}

/// Sending half of the completion queue
pub type CompletionSender = mpsc::UnboundedSender<ProbeOutcome>;

/// A probe scheduled for one run
#[derive(Clone)]
pub struct ProbeTask {
    pub probe: Arc<dyn Probe>,
    /// Runs on its own worker: acquires a session and reports to the queue
    pub threaded: bool,
}

impl ProbeTask {
    #[must_use]
    pub fn inline(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            threaded: false,
        }
    }

    #[must_use]
    pub fn threaded(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            threaded: true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.probe.name()
    }
}

impl std::fmt::Debug for ProbeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeTask")
            .field("probe", &self.probe.name())
            .field("threaded", &self.threaded)
            .finish()
    }
}

/// Runs probes against hosts and finalizes their envelopes
pub struct ProbeRunner {
    factory: Arc<dyn InterfaceFactory>,
    settings: ReportSettings,
    timeout: Option<Duration>,
}

impl ProbeRunner {
    #[must_use]
    pub fn new(factory: Arc<dyn InterfaceFactory>, settings: ReportSettings) -> Self {
        Self {
            factory,
            settings,
            timeout: None,
        }
    }

    /// Bound every probe's collection by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Run one probe to completion and return its body
    ///
    /// Never fails: any error, including a panic inside the probe, is routed
    /// through [`handle_error`]. A threaded task also forwards its body to
    /// `completion`, success or failure.
    #[instrument(skip(self, task, completion), fields(probe = task.name(), threaded = task.threaded))]
    pub async fn invoke(
        &self,
        task: &ProbeTask,
        host: &str,
        completion: Option<&CompletionSender>,
    ) -> ReturnBody {
        let mut envelope = ReportEnvelope::new(task.probe.capability_name(), host, &self.settings);

        let result = AssertUnwindSafe(self.collect(task, host))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(CoreError::WorkerPanicked(panic_message(&*payload))));

        let body = match result {
            Ok(content) => {
                info!(keys = content.len(), "probe collected");
                envelope.content = content;
                envelope.outcome = Outcome::Successful;
                envelope.finalize_and_persist()
            }
            Err(err) => handle_error(envelope, &err, None),
        };

        if task.threaded {
            if let Some(completion) = completion {
                let outcome = ProbeOutcome {
                    probe: task.name().to_string(),
                    body: body.clone(),
                };
                if completion.send(outcome).is_err() {
                    debug!("completion queue closed; outcome dropped");
                }
            }
        }

        body
    }

    async fn collect(&self, task: &ProbeTask, host: &str) -> Result<Content, CoreError> {
        let iface = self
            .factory
            .connect(host)
            .await
            .map_err(|source| CoreError::Connect {
                host: host.to_string(),
                source,
            })?;

        // Released on every exit from this function, including cancellation.
        let _session = if task.threaded {
            Some(SessionGuard::acquire(Arc::clone(&iface)).map_err(CoreError::Session)?)
        } else {
            None
        };

        let collect = task.probe.collect(iface.as_ref());
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| CoreError::Timeout(limit))?
                .map_err(CoreError::from),
            None => collect.await.map_err(CoreError::from),
        }
    }
}

/// Text of a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl std::fmt::Debug for ProbeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRunner")
            .field("settings", &self.settings)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_payloads() {
        let text: Box<dyn Any + Send> = Box::new("probe exploded");
        let owned: Box<dyn Any + Send> = Box::new(format!("index {} out of range", 3));
        let other: Box<dyn Any + Send> = Box::new(7_u32);

        assert_eq!(panic_message(&*text), "probe exploded");
        assert_eq!(panic_message(&*owned), "index 3 out of range");
        assert_eq!(panic_message(&*other), "non-string panic payload");
    }
}
