//! Reassembly of answers the service splits across several turns.
//!
//! Long answers come back cut off. The compiled prompt asks the model to end
//! its final answer with [`TERMINATOR`]; until that token shows up, the
//! reassembler keeps asking it to continue and concatenates what it gets.

use std::time::{Duration, Instant};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::observability::{CONTINUATIONS, RECEIVE_TIMEOUTS, RESPONSE_DURATION};
use crate::types::Model;

/// Token marking a complete answer.
pub const TERMINATOR: &str = "<end>";

/// Instruction sent when an answer stopped before [`TERMINATOR`].
pub const CONTINUE_PROMPT: &str =
    "Continue EXACTLY where you left off without any other text at start.";

/// Attempt budget for the initial, file-laden prompt.
pub const INITIAL_ATTEMPTS: usize = 10;

/// Attempt budget for interactive follow-ups.
pub const FOLLOW_UP_ATTEMPTS: usize = 20;

/// Anything that can carry a conversation turn out and an answer back.
#[async_trait::async_trait]
pub trait TurnChannel: Send {
    /// Send `text` as a user turn for `model`.
    async fn send_turn(&mut self, text: &str, model: &Model) -> Result<()>;

    /// Wait up to `timeout` for the next answer fragment.
    async fn receive(&mut self, timeout: Duration) -> Result<String>;
}

#[async_trait::async_trait]
impl TurnChannel for Connection {
    async fn send_turn(&mut self, text: &str, model: &Model) -> Result<()> {
        Connection::send_turn(self, text, model).await
    }

    async fn receive(&mut self, timeout: Duration) -> Result<String> {
        Connection::receive(self, timeout).await
    }
}

/// Hooks for watching turns go out and fragments come in.
pub trait ReassemblyObserver: Send {
    /// Called before each turn is sent, including continuation requests.
    fn on_send(&mut self, text: &str) {
        _ = text;
    }

    /// Called for each fragment received.
    fn on_fragment(&mut self, fragment: &str) {
        _ = fragment;
    }
}

impl ReassemblyObserver for () {}

/// Why collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The accumulated text ends with [`TERMINATOR`].
    Terminated,
    /// Every attempt delivered a fragment but none carried the terminator.
    Exhausted,
    /// No fragment arrived within the per-attempt timeout.
    TimedOut,
    /// The connection failed part way; see [`Collected::error`].
    Failed,
}

/// The result of [`send_and_collect`].
#[derive(Debug, Clone)]
pub struct Collected {
    /// All fragments, concatenated in arrival order.
    pub text: String,
    /// Number of fragments received.
    pub deliveries: usize,
    /// Number of continuation requests sent.
    pub continuations: usize,
    /// Why collection stopped.
    pub completion: Completion,
    /// The error that ended collection when `completion` is
    /// [`Completion::Failed`].
    pub error: Option<Error>,
}

impl Collected {
    /// Returns true if the answer ended with the terminator.
    pub fn is_terminated(&self) -> bool {
        self.completion == Completion::Terminated
    }

    /// Returns true if collection stopped because the background reader is
    /// gone. No later turn on the same connection can be answered.
    pub fn connection_lost(&self) -> bool {
        self.error.as_ref().is_some_and(Error::is_channel_closed)
    }

    fn fail(&mut self, err: Error) {
        tracing::warn!(
            attempts = self.deliveries,
            error = %err,
            "connection failed while collecting answer"
        );
        self.completion = Completion::Failed;
        self.error = Some(err);
    }
}

/// Send `initial_text` and gather the answer across up to `max_attempts`
/// deliveries.
///
/// A timeout ends collection early with whatever has arrived; it is not an
/// error. No continuation is requested after the last attempt. Once the
/// initial turn is out, any other failure also ends collection with the text
/// gathered so far, marked [`Completion::Failed`] and carrying the error.
///
/// # Errors
///
/// Returns an error only if the initial turn cannot be sent.
pub async fn send_and_collect<C: TurnChannel + ?Sized>(
    channel: &mut C,
    initial_text: &str,
    model: &Model,
    max_attempts: usize,
    per_attempt_timeout: Duration,
    observer: &mut dyn ReassemblyObserver,
) -> Result<Collected> {
    let start = Instant::now();
    observer.on_send(initial_text);
    channel.send_turn(initial_text, model).await?;

    let mut collected = Collected {
        text: String::new(),
        deliveries: 0,
        continuations: 0,
        completion: Completion::Exhausted,
        error: None,
    };
    for attempt in 1..=max_attempts {
        let fragment = match channel.receive(per_attempt_timeout).await {
            Ok(fragment) => fragment,
            Err(err) if err.is_timeout() => {
                RECEIVE_TIMEOUTS.click();
                tracing::warn!(attempt, error = %err, "failed to receive message");
                collected.completion = Completion::TimedOut;
                break;
            }
            Err(err) => {
                collected.fail(err);
                break;
            }
        };
        observer.on_fragment(&fragment);
        collected.text.push_str(&fragment);
        collected.deliveries = attempt;
        if collected.text.ends_with(TERMINATOR) {
            collected.completion = Completion::Terminated;
            break;
        }
        if attempt == max_attempts {
            break;
        }
        CONTINUATIONS.click();
        collected.continuations += 1;
        observer.on_send(CONTINUE_PROMPT);
        if let Err(err) = channel.send_turn(CONTINUE_PROMPT, model).await {
            collected.fail(err);
            break;
        }
    }

    RESPONSE_DURATION.add(start.elapsed().as_secs_f64());
    tracing::info!(
        attempts = collected.deliveries,
        continuations = collected.continuations,
        completion = ?collected.completion,
        "answer collected"
    );
    Ok(collected)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::connection::tests::{RecordingSink, channel_source, completed};
    use crate::history::ConversationHistory;
    use crate::types::KnownModel;

    /// Replays scripted fragments and records what was sent.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedChannel {
        pub(crate) fragments: VecDeque<Result<String>>,
        pub(crate) sent: Vec<String>,
        pub(crate) receives: usize,
        pub(crate) send_calls: usize,
        pub(crate) fail_send_at: Option<usize>,
    }

    impl ScriptedChannel {
        pub(crate) fn new(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl TurnChannel for ScriptedChannel {
        async fn send_turn(&mut self, text: &str, _: &Model) -> Result<()> {
            let call = self.send_calls;
            self.send_calls += 1;
            if self.fail_send_at == Some(call) {
                return Err(Error::transport("connection reset", None));
            }
            self.sent.push(text.to_string());
            Ok(())
        }

        async fn receive(&mut self, timeout: Duration) -> Result<String> {
            self.receives += 1;
            self.fragments.pop_front().unwrap_or_else(|| {
                Err(Error::timeout(
                    "timeout waiting for message",
                    Some(timeout.as_secs_f64()),
                ))
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        sends: Vec<String>,
        fragments: Vec<String>,
    }

    impl ReassemblyObserver for Recorder {
        fn on_send(&mut self, text: &str) {
            self.sends.push(text.to_string());
        }

        fn on_fragment(&mut self, fragment: &str) {
            self.fragments.push(fragment.to_string());
        }
    }

    fn model() -> Model {
        Model::Known(KnownModel::Claude3Haiku20240307)
    }

    const TIMEOUT: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn stops_at_terminator() {
        let mut channel = ScriptedChannel::new(&["ab", "cd", "<end>", "unused"]);
        let collected = send_and_collect(&mut channel, "start", &model(), 10, TIMEOUT, &mut ())
            .await
            .unwrap();
        assert_eq!(collected.text, "abcd<end>");
        assert_eq!(collected.deliveries, 3);
        assert!(collected.continuations <= 3);
        assert_eq!(collected.continuations, 2);
        assert!(collected.is_terminated());
        assert_eq!(channel.receives, 3);
        assert_eq!(channel.sent, vec!["start", CONTINUE_PROMPT, CONTINUE_PROMPT]);
    }

    #[tokio::test]
    async fn exhausts_attempts_without_error() {
        let mut channel = ScriptedChannel::new(&["a", "b", "c", "d", "e"]);
        let collected = send_and_collect(&mut channel, "start", &model(), 4, TIMEOUT, &mut ())
            .await
            .unwrap();
        assert_eq!(collected.text, "abcd");
        assert_eq!(collected.deliveries, 4);
        assert_eq!(collected.completion, Completion::Exhausted);
        assert!(!collected.is_terminated());
        assert_eq!(channel.sent.len(), 4);
    }

    #[tokio::test]
    async fn timeout_returns_partial() {
        let mut channel = ScriptedChannel::new(&["partial "]);
        let collected = send_and_collect(&mut channel, "start", &model(), 10, TIMEOUT, &mut ())
            .await
            .unwrap();
        assert_eq!(collected.text, "partial ");
        assert_eq!(collected.deliveries, 1);
        assert_eq!(collected.completion, Completion::TimedOut);
        assert_eq!(channel.receives, 2);
    }

    #[tokio::test]
    async fn terminator_split_across_fragments() {
        let mut channel = ScriptedChannel::new(&["done <e", "nd>"]);
        let collected = send_and_collect(&mut channel, "start", &model(), 10, TIMEOUT, &mut ())
            .await
            .unwrap();
        assert_eq!(collected.text, "done <end>");
        assert!(collected.is_terminated());
    }

    #[tokio::test]
    async fn connection_failure_keeps_partial_text() {
        let mut channel = ScriptedChannel::new(&["first half"]);
        channel
            .fragments
            .push_back(Err(Error::protocol("unexpected message", Some("41".into()))));
        let collected = send_and_collect(&mut channel, "start", &model(), 10, TIMEOUT, &mut ())
            .await
            .unwrap();
        assert_eq!(collected.text, "first half");
        assert_eq!(collected.deliveries, 1);
        assert_eq!(collected.completion, Completion::Failed);
        assert!(collected.error.unwrap().is_protocol());
    }

    #[tokio::test]
    async fn failed_continuation_keeps_partial_text() {
        let mut channel = ScriptedChannel::new(&["abc"]);
        channel.fail_send_at = Some(1);
        let collected = send_and_collect(&mut channel, "start", &model(), 10, TIMEOUT, &mut ())
            .await
            .unwrap();
        assert_eq!(collected.text, "abc");
        assert_eq!(collected.completion, Completion::Failed);
        assert!(collected.error.unwrap().is_transport());
        assert_eq!(channel.receives, 1);
    }

    #[tokio::test]
    async fn failed_initial_send_is_an_error() {
        let mut channel = ScriptedChannel::new(&["unused"]);
        channel.fail_send_at = Some(0);
        let err = send_and_collect(&mut channel, "start", &model(), 10, TIMEOUT, &mut ())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(channel.receives, 0);
    }

    #[tokio::test]
    async fn reader_failure_on_connection_keeps_partial_text() {
        let sink = RecordingSink::default();
        let (tx, source) = channel_source();
        let mut conn = Connection::start(Box::new(sink), source, ConversationHistory::new(), None);
        tx.unbounded_send(Ok(completed("first half"))).unwrap();
        tx.unbounded_send(Ok("41".to_string())).unwrap();

        let collected = send_and_collect(
            &mut conn,
            "start",
            &model(),
            10,
            Duration::from_secs(1),
            &mut (),
        )
        .await
        .unwrap();
        assert_eq!(collected.text, "first half");
        assert_eq!(collected.completion, Completion::Failed);
        assert!(collected.error.unwrap().is_protocol());
    }

    #[tokio::test]
    async fn observer_sees_turns_and_fragments() {
        let mut channel = ScriptedChannel::new(&["x", "y<end>"]);
        let mut recorder = Recorder::default();
        send_and_collect(&mut channel, "go", &model(), 10, TIMEOUT, &mut recorder)
            .await
            .unwrap();
        assert_eq!(recorder.sends, vec!["go", CONTINUE_PROMPT]);
        assert_eq!(recorder.fragments, vec!["x", "y<end>"]);
    }
}
