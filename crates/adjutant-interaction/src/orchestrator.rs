//! Run orchestration: one conversational turn from user text to reply.
//!
//! `Idle -> MessagePosted -> Running -> {Completed | Failed | Cancelled |
//! Expired}`, expressed as one sequential async function. The only repeated
//! suspension point is the status-polling loop, which waits with a capped
//! exponential backoff before every status check. Any failure at any step
//! aborts the remainder of the turn; the caller retries the whole turn.

use std::cmp;
use std::time::Duration;

use adjutant_core::{AdjutantError, Result, RunStatus, Session};
use tokio::sync::Mutex;

use crate::resources::AssistantsClient;
use crate::transport::Transport;

/// Fallback detail when a failed run carries no error message.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Polling schedule for run status checks.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay before the first status check
    pub initial_delay: Duration,
    /// Factor applied to the delay after each check
    pub multiplier: f64,
    /// Upper bound on the delay between checks
    pub max_delay: Duration,
    /// Maximum number of status checks before giving up with
    /// [`AdjutantError::Timeout`]. `None` polls until a terminal status,
    /// however long that takes.
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            multiplier: 1.5,
            max_delay: Duration::from_millis(3000),
            max_polls: None,
        }
    }
}

impl PollPolicy {
    /// Bounds the number of status checks.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    /// The delay schedule, starting from the initial delay.
    pub fn delays(&self) -> Backoff {
        Backoff {
            next: self.initial_delay,
            multiplier: self.multiplier,
            max: self.max_delay,
        }
    }
}

/// Produces the capped exponential delay sequence of a [`PollPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    multiplier: f64,
    max: Duration,
}

impl Backoff {
    /// Returns the next delay and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = cmp::min(self.next.mul_f64(self.multiplier), self.max);
        current
    }
}

/// The assistant's reply for one turn.
///
/// An empty `text` means the remote returned no messages; callers should
/// treat that as "no reply", not as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
}

impl AssistantReply {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Drives a single conversational turn: post the user's message, start a
/// run, poll it to a terminal status, fetch the resulting message.
///
/// The orchestrator never mutates the session; it reads the identifiers at
/// the start of the turn and reports a terminal outcome. A busy guard
/// serializes turns so a second concurrent call fails fast instead of
/// interleaving requests on the same thread.
pub struct RunOrchestrator<T: Transport> {
    client: AssistantsClient<T>,
    policy: PollPolicy,
    busy: Mutex<()>,
}

impl<T: Transport> RunOrchestrator<T> {
    pub fn new(client: AssistantsClient<T>, policy: PollPolicy) -> Self {
        Self {
            client,
            policy,
            busy: Mutex::new(()),
        }
    }

    /// The underlying resource client, for setup and upload calls that
    /// happen outside a turn.
    pub fn client(&self) -> &AssistantsClient<T> {
        &self.client
    }

    /// Runs one conversational turn and returns the assistant's reply.
    ///
    /// Preconditions: the session has both an assistant and a thread, and
    /// `user_text` is non-empty after trimming. Violations return
    /// [`AdjutantError::Validation`] without any network call.
    pub async fn run_turn(&self, session: &Session, user_text: &str) -> Result<AssistantReply> {
        let _guard = self.busy.try_lock().map_err(|_| {
            AdjutantError::validation("a turn is already in flight for this session")
        })?;

        let (assistant_id, thread_id) = match (&session.assistant_id, &session.thread_id) {
            (Some(assistant_id), Some(thread_id)) => (assistant_id.as_str(), thread_id.as_str()),
            _ => {
                return Err(AdjutantError::validation(
                    "an assistant and a thread must be created before chatting",
                ))
            }
        };

        let text = user_text.trim();
        if text.is_empty() {
            return Err(AdjutantError::validation("message text is empty"));
        }

        // MessagePosted: a failure here means no run is ever started.
        self.client.post_message(thread_id, text, Vec::new()).await?;

        let run_id = self.client.start_run(thread_id, assistant_id).await?;
        tracing::debug!(%run_id, %thread_id, "run started");

        let status = self.poll_until_terminal(thread_id, &run_id).await?;
        tracing::info!(%run_id, %status, "run reached terminal status");

        let messages = self.client.list_messages(thread_id).await?;
        let text = messages
            .first()
            .map(|message| message.display_content())
            .unwrap_or_default();
        Ok(AssistantReply { text })
    }

    /// Polls the run until it completes, waiting before every check
    /// (including the first). Non-completed terminal statuses become
    /// [`AdjutantError::RunTerminal`]; exceeding the poll budget becomes
    /// [`AdjutantError::Timeout`].
    async fn poll_until_terminal(&self, thread_id: &str, run_id: &str) -> Result<RunStatus> {
        let mut delays = self.policy.delays();
        let mut polls: u32 = 0;

        loop {
            if let Some(max_polls) = self.policy.max_polls {
                if polls >= max_polls {
                    return Err(AdjutantError::Timeout { attempts: polls });
                }
            }

            tokio::time::sleep(delays.next_delay()).await;
            polls += 1;

            let run = self.client.fetch_run(thread_id, run_id).await?;
            tracing::debug!(status = %run.status, polls, "run status");

            match run.status {
                RunStatus::Completed => return Ok(run.status),
                status if status.is_terminal() => {
                    return Err(AdjutantError::run_terminal(
                        status.as_str(),
                        run.error_message().unwrap_or(UNKNOWN_ERROR),
                    ));
                }
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_sequence_is_capped_at_three_seconds() {
        let policy = PollPolicy::default();
        let mut backoff = policy.delays();

        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 1500, 2250, 3000, 3000, 3000]);
    }

    #[test]
    fn backoff_respects_custom_policy() {
        let policy = PollPolicy {
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_millis(350),
            max_polls: None,
        };
        let mut backoff = policy.delays();

        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
    }

    #[test]
    fn empty_reply_is_distinguishable() {
        assert!(AssistantReply { text: String::new() }.is_empty());
        assert!(!AssistantReply { text: "hi".to_string() }.is_empty());
    }
}
