//! Interaction state machine and its async driver.
//!
//! [`RefactorSession`] is the pure state: `Idle`, collecting a prompt, or
//! awaiting generation, each interaction tagged with a [`Ticket`].
//! [`Refactorer`] runs one interaction end to end against a [`PromptUi`] and
//! a [`Generator`](crate::generator::Generator).

pub mod driver;
pub mod prompt;
pub mod state;

pub use driver::{context_for, Outcome, PromptUi, RefactorError, Refactorer};
pub use prompt::PromptReply;
pub use state::{Invocation, Phase, RefactorSession, SessionError, Ticket, ASK_LABEL, SUGGEST_LABEL};
