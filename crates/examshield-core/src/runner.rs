//! Single-task event loop for a live session.
//!
//! The runner owns the [`Session`] and processes candidate commands,
//! visibility signals, and clock ticks one at a time. The ticker is cancelled
//! in the same iteration that observes submission, so a submitted session
//! never sees another tick.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::SessionError;
use crate::model::ImageRef;
use crate::results::AttemptResult;
use crate::session::Session;
use crate::timer::{Ticker, DEFAULT_TICK_PERIOD};

/// Events fed into a running session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionCommand {
    Select { question: String, option: usize },
    Text { question: String, text: String },
    Image { question: String, image: ImageRef },
    Goto { index: usize },
    Next,
    Previous,
    /// The page lost focus.
    Hidden,
    /// The page regained focus.
    Visible,
    /// Advance the clock by this many seconds, outside the regular cadence.
    Elapse { seconds: u32 },
    Submit,
}

impl SessionCommand {
    fn operation(&self) -> &'static str {
        match self {
            SessionCommand::Select { .. } => "select",
            SessionCommand::Text { .. } => "text",
            SessionCommand::Image { .. } => "image",
            SessionCommand::Goto { .. } => "goto",
            SessionCommand::Next => "next",
            SessionCommand::Previous => "previous",
            SessionCommand::Hidden => "hidden",
            SessionCommand::Visible => "visible",
            SessionCommand::Elapse { .. } => "elapse",
            SessionCommand::Submit => "submit",
        }
    }
}

/// Drives a [`Session`] from a command channel and a countdown ticker.
#[derive(Debug)]
pub struct SessionRunner {
    session: Session,
    tick_period: Duration,
}

impl SessionRunner {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Spawn the runner on the current runtime.
    pub fn spawn(
        self,
        buffer: usize,
    ) -> (
        mpsc::Sender<SessionCommand>,
        JoinHandle<Result<AttemptResult, SessionError>>,
    ) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }

    /// Run until the session is submitted and return its result.
    ///
    /// Closing the command channel does not stop the clock; the session then
    /// runs until the time budget expires.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) -> Result<AttemptResult, SessionError> {
        let mut ticker = Ticker::start(self.tick_period);
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.apply(command).await,
                    None => {
                        tracing::debug!("command channel closed, waiting for the clock");
                        commands_open = false;
                    }
                },
                Some(elapsed) = ticker.tick() => {
                    if let Err(e) = self.session.tick(elapsed).await {
                        self.reject("tick", &e);
                    }
                }
                else => break,
            }

            if self.session.is_submitted() {
                ticker.cancel();
                break;
            }
        }

        // Returns the stored result when the loop ended on submission.
        self.session.submit().await
    }

    async fn apply(&mut self, command: SessionCommand) {
        let operation = command.operation();
        let outcome = match command {
            SessionCommand::Select { question, option } => {
                self.session.select_option(&question, option)
            }
            SessionCommand::Text { question, text } => self.session.set_text(&question, text),
            SessionCommand::Image { question, image } => {
                self.session.set_image_ref(&question, image)
            }
            SessionCommand::Goto { index } => self.session.go_to(index),
            SessionCommand::Next => self.session.next_question().map(|_| ()),
            SessionCommand::Previous => self.session.previous_question().map(|_| ()),
            SessionCommand::Hidden => {
                self.session.visibility_changed(true);
                Ok(())
            }
            SessionCommand::Visible => {
                self.session.visibility_changed(false);
                Ok(())
            }
            SessionCommand::Elapse { seconds } => self.session.tick(seconds).await.map(|_| ()),
            SessionCommand::Submit => self.session.submit().await.map(|_| ()),
        };
        if let Err(e) = outcome {
            self.reject(operation, &e);
        }
    }

    fn reject(&self, operation: &str, error: &SessionError) {
        tracing::warn!("{operation} rejected: {error}");
        self.session.notify_rejected(operation, error);
    }
}
