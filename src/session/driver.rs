use crate::annotate::annotation_edit;
use crate::config::SpliceConfig;
use crate::document::{SourceDocument, Span};
use crate::edit::{EditError, TextEdit};
use crate::generator::{GenerationError, GenerationRequest, Generator};
use crate::resolve::{plan_splice, Splice, SpliceError};
use crate::response::{self, ParseFailure};
use crate::session::prompt::{prompt_channel, PromptReply};
use crate::session::state::{Invocation, RefactorSession, Ticket};
use crate::ts::{SyntaxNode, TreeSitterError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// The host editor, as seen by the driver.
pub trait PromptUi: Send + Sync {
    /// Show the prompt input for `selection`. The UI answers through `reply`.
    fn show_prompt_surface(&self, selection: Span, reply: PromptReply);

    fn hide_prompt_surface(&self);

    /// Reflect an edit the driver has applied to the document.
    fn apply_inline_edit(&self, edit: &TextEdit);
}

#[derive(Error, Debug)]
pub enum RefactorError {
    #[error(transparent)]
    TreeSitter(#[from] TreeSitterError),

    #[error(transparent)]
    Splice(#[from] SpliceError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// How one [`Refactorer::run`] ended.
#[derive(Debug)]
pub enum Outcome {
    /// The response replaced the resolved node.
    Applied {
        document: SourceDocument,
        splice: Splice,
        reused: bool,
    },
    /// The response did not parse and was inserted as a comment block.
    Annotated {
        document: SourceDocument,
        edit: TextEdit,
        failure: ParseFailure,
    },
    /// The response did not parse; the document is unchanged.
    Rejected { failure: ParseFailure },
    /// The user dismissed the prompt.
    Cancelled,
    /// An interaction at the same span is still running.
    Busy,
    /// A newer interaction replaced this one; its result was dropped.
    Superseded,
    GenerationFailed { error: GenerationError },
}

impl Outcome {
    /// The new document, when the run changed it.
    pub fn document(&self) -> Option<&SourceDocument> {
        match self {
            Outcome::Applied { document, .. } | Outcome::Annotated { document, .. } => {
                Some(document)
            }
            _ => None,
        }
    }
}

/// Drives interactions for one editor view.
pub struct Refactorer<G, U> {
    session: Arc<Mutex<RefactorSession>>,
    generator: G,
    ui: U,
    config: SpliceConfig,
}

impl<G: Generator, U: PromptUi> Refactorer<G, U> {
    pub fn new(generator: G, ui: U, config: SpliceConfig) -> Self {
        Self::with_session(Arc::new(Mutex::new(RefactorSession::new())), generator, ui, config)
    }

    pub fn with_session(
        session: Arc<Mutex<RefactorSession>>,
        generator: G,
        ui: U,
        config: SpliceConfig,
    ) -> Self {
        Self {
            session,
            generator,
            ui,
            config,
        }
    }

    pub fn session(&self) -> Arc<Mutex<RefactorSession>> {
        Arc::clone(&self.session)
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn action_label(&self, span: Span) -> &'static str {
        self.lock().action_label(span)
    }

    // Never hold the guard across an await.
    fn lock(&self) -> MutexGuard<'_, RefactorSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one interaction for `selection` in `document`.
    ///
    /// The returned outcome carries the new document when one was produced;
    /// `document` itself is never modified.
    pub async fn run(
        &self,
        document: &SourceDocument,
        selection: Span,
    ) -> Result<Outcome, RefactorError> {
        let tree = document.syntax_tree()?;
        let anchor = tree.find_node_at(selection)?;
        let span = anchor.span();

        let invocation = self.lock().invoke(span);
        let ticket = match invocation {
            Invocation::Busy => return Ok(Outcome::Busy),
            Invocation::Reuse(text) => return self.respond(document, anchor, text, true),
            Invocation::Ask(ticket) => ticket,
        };

        let (reply, receiver) = prompt_channel();
        self.ui.show_prompt_surface(selection, reply);
        let prompt = receiver.recv().await;
        self.ui.hide_prompt_surface();

        let Some(prompt) = prompt else {
            return Ok(self.cancelled(ticket));
        };
        let accepted = self.lock().prompt_received(ticket);
        if accepted.is_err() {
            return Ok(Outcome::Superseded);
        }

        let context = context_for(anchor, self.config.prompt.max_context_bytes);
        let request = GenerationRequest::new(&self.config.prompt, prompt, anchor.text(), context);
        tracing::debug!(%ticket, %span, kind = anchor.kind(), "requesting generation");
        let generated = self.generator.generate(&request).await;

        let completed = self.lock().complete(ticket);
        if let Err(error) = completed {
            tracing::warn!(%error, "discarding result of a superseded interaction");
            return Ok(Outcome::Superseded);
        }

        match generated {
            Ok(text) => self.respond(document, anchor, text, false),
            Err(error) => {
                tracing::warn!(%ticket, %error, "generation failed");
                Ok(Outcome::GenerationFailed { error })
            }
        }
    }

    fn cancelled(&self, ticket: Ticket) -> Outcome {
        match self.lock().cancel(ticket) {
            Ok(()) => {
                tracing::debug!(%ticket, "prompt dismissed");
                Outcome::Cancelled
            }
            Err(_) => Outcome::Superseded,
        }
    }

    fn respond(
        &self,
        document: &SourceDocument,
        anchor: SyntaxNode<'_>,
        text: String,
        reused: bool,
    ) -> Result<Outcome, RefactorError> {
        let parsed = if text.trim().is_empty() {
            Err(ParseFailure::Empty)
        } else {
            response::parse(&text)
        };

        match parsed {
            Ok(parsed) => {
                let splice = plan_splice(document, anchor, &parsed)?;
                let updated = splice.edit.apply_to(document)?;
                self.ui.apply_inline_edit(&splice.edit);
                self.lock().record_applied(anchor.span(), text);
                tracing::info!(
                    span = %splice.target_span(),
                    target = %splice.target_category,
                    replaced = %splice.replaced_category,
                    reused,
                    "applied generated code"
                );
                Ok(Outcome::Applied {
                    document: updated,
                    splice,
                    reused,
                })
            }
            Err(failure) if self.config.session.annotate_failures => {
                let edit = annotation_edit(document, anchor, &text)?;
                let updated = edit.apply_to(document)?;
                self.ui.apply_inline_edit(&edit);
                tracing::info!(%failure, "kept unparsable response as a comment");
                Ok(Outcome::Annotated {
                    document: updated,
                    edit,
                    failure,
                })
            }
            Err(failure) => {
                tracing::info!(%failure, "rejected unparsable response");
                Ok(Outcome::Rejected { failure })
            }
        }
    }
}

/// Text of the nearest item strictly enclosing `anchor`, sent to the
/// generator as context. Items longer than `max_bytes` contribute only their
/// first line.
pub fn context_for(anchor: SyntaxNode<'_>, max_bytes: usize) -> String {
    let span = anchor.span();
    let enclosing = anchor
        .ancestors()
        .skip(1)
        .find(|node| node.category().is_item() && node.span() != span);

    let Some(item) = enclosing else {
        return String::new();
    };

    let text = item.text();
    if text.len() <= max_bytes {
        text.to_string()
    } else {
        text.lines().next().unwrap_or_default().to_string()
    }
}
