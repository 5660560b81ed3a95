//! Core chat session management.
//!
//! A [`ChatSession`] pairs a live [`TurnChannel`] with the resolved
//! [`ChatConfig`] and drives every exchange through the reassembler.

use crate::chat::config::ChatConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::history::ConversationHistory;
use crate::reassemble::{Collected, Completion, TurnChannel, send_and_collect};
use crate::render::{EchoObserver, Renderer};
use crate::types::Model;

/// Counters describing a session so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Completed exchanges, initial one included.
    pub exchanges: u64,
    /// Continuation requests sent across all exchanges.
    pub continuations: u64,
    /// Exchanges that ended on a timeout.
    pub timeouts: u64,
    /// Exchanges that used every attempt without seeing the terminator.
    pub exhausted: u64,
    /// Exchanges cut short by a connection failure.
    pub failures: u64,
}

/// A chat session over one connection.
pub struct ChatSession<C: TurnChannel = Connection> {
    channel: C,
    history: ConversationHistory,
    config: ChatConfig,
    stats: SessionStats,
}

impl ChatSession<Connection> {
    /// Creates a session over an open connection.
    pub fn new(connection: Connection, config: ChatConfig) -> Self {
        let history = connection.history().clone();
        Self::with_channel(connection, history, config)
    }

    /// Closes the underlying connection.
    pub async fn close(self) -> Result<()> {
        self.channel.close().await
    }
}

impl<C: TurnChannel> ChatSession<C> {
    /// Creates a session over any channel. `history` must be the history the
    /// channel records turns in.
    pub fn with_channel(channel: C, history: ConversationHistory, config: ChatConfig) -> Self {
        Self {
            channel,
            history,
            config,
            stats: SessionStats::default(),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The model answering every turn.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// The shared conversation history.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Counters for this session.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Sends the compiled file prompt using the initial attempt budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be sent. Later failures come
    /// back as a [`Completion::Failed`] result holding the partial answer.
    pub async fn send_initial(
        &mut self,
        compiled_prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<Collected> {
        let attempts = self.config.initial_attempts;
        self.exchange(compiled_prompt, attempts, renderer).await
    }

    /// Sends an interactive follow-up using the follow-up attempt budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the turn cannot be sent.
    pub async fn send(&mut self, text: &str, renderer: &mut dyn Renderer) -> Result<Collected> {
        let attempts = self.config.follow_up_attempts;
        self.exchange(text, attempts, renderer).await
    }

    /// Removes the last user/assistant exchange from the history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientHistory`](crate::Error::InsufficientHistory)
    /// when fewer than two turns are recorded.
    pub fn backtrack(&self) -> Result<()> {
        self.history.undo()
    }

    async fn exchange(
        &mut self,
        text: &str,
        attempts: usize,
        renderer: &mut dyn Renderer,
    ) -> Result<Collected> {
        let model = self.config.model.clone();
        let timeout = self.config.timeout;
        let collected = if self.config.echo {
            let mut echo = EchoObserver::new(renderer);
            send_and_collect(&mut self.channel, text, &model, attempts, timeout, &mut echo).await?
        } else {
            send_and_collect(&mut self.channel, text, &model, attempts, timeout, &mut ()).await?
        };

        self.stats.exchanges += 1;
        self.stats.continuations += collected.continuations as u64;
        match collected.completion {
            Completion::Terminated => {}
            Completion::TimedOut => self.stats.timeouts += 1,
            Completion::Exhausted => self.stats.exhausted += 1,
            Completion::Failed => self.stats.failures += 1,
        }
        Ok(collected)
    }
}
