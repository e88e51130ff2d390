//! Deterministic in-process driver.
//!
//! Replies are produced by a closure over the incoming [`LlmRequest`], which
//! makes council flows reproducible in tests and lets the server run without
//! network access (`--offline`).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{LlmDriver, LlmEvent, LlmEventStream, LlmRequest};

type ReplyFn = dyn Fn(&LlmRequest) -> Option<String> + Send + Sync;

/// Driver that answers from a closure instead of a remote API.
///
/// Returning `None` from the closure makes the request fail, which the
/// [`LlmClient`](super::LlmClient) reports as a failed model.
#[derive(Clone)]
pub struct ScriptedDriver {
    reply: Arc<ReplyFn>,
    delay: Option<Duration>,
    /// Request log; `None` unless [`ScriptedDriver::recording`] was called.
    requests: Option<Arc<Mutex<Vec<LlmRequest>>>>,
}

impl std::fmt::Debug for ScriptedDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedDriver")
            .field("delay", &self.delay)
            .field("recording", &self.requests.is_some())
            .finish_non_exhaustive()
    }
}

impl ScriptedDriver {
    /// Create a driver from a reply function.
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&LlmRequest) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            reply: Arc::new(reply),
            delay: None,
            requests: None,
        }
    }

    /// Driver used by `--offline`: every model answers with a short canned
    /// reply naming itself, and rankers emit a valid `FINAL RANKING:`.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(|req| {
            let prompt = req.messages.last().map_or("", |m| m.content.as_str());
            if prompt.starts_with("You are evaluating") {
                // Only "Response X:" headers name real answers; the format
                // example in the prompt has no colon.
                let labels: Vec<&str> = prompt
                    .match_indices("Response ")
                    .filter_map(|(i, _)| prompt.get(i..i + 11))
                    .filter_map(|l| l.strip_suffix(':'))
                    .filter(|l| l.chars().last().is_some_and(|c| c.is_ascii_uppercase()))
                    .collect();
                let mut unique: Vec<&str> = Vec::new();
                for l in labels {
                    if !unique.contains(&l) {
                        unique.push(l);
                    }
                }
                let list: Vec<String> = unique
                    .iter()
                    .enumerate()
                    .map(|(i, l)| format!("{}. {l}", i + 1))
                    .collect();
                Some(format!(
                    "All responses are reasonable.\n\nFINAL RANKING:\n{}",
                    list.join("\n")
                ))
            } else {
                Some(format!("*Offline reply from `{}`.*", req.model))
            }
        })
    }

    /// Delay every reply by `delay` before the first event.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Keep every incoming request so tests can inspect prompts.
    ///
    /// The log is unbounded; the offline server never enables it.
    #[must_use]
    pub fn recording(mut self) -> Self {
        self.requests = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    /// Requests received so far, in arrival order. Empty unless recording.
    #[must_use]
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.as_ref().map_or_else(Vec::new, |log| {
            log.lock().unwrap_or_else(PoisonError::into_inner).clone()
        })
    }
}

#[async_trait::async_trait]
impl LlmDriver for ScriptedDriver {
    async fn stream(&self, req: LlmRequest) -> anyhow::Result<LlmEventStream> {
        if let Some(log) = &self.requests {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(req.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let Some(text) = (self.reply)(&req) else {
            anyhow::bail!("scripted failure for model {}", req.model);
        };

        let events = vec![Ok(LlmEvent::ContentDelta(text)), Ok(LlmEvent::Done)];
        Ok(Box::pin(futures::stream::iter(events)))
    }
}
