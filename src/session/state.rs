use crate::document::Span;
use std::fmt;
use thiserror::Error;

/// Label shown when the session will ask for a prompt.
pub const ASK_LABEL: &str = "✨ Ask an AI";

/// Label shown when a cached response will be re-applied.
pub const SUGGEST_LABEL: &str = "✨ Get an AI suggestion";

/// Identifies one interaction. Each `invoke` that begins an interaction gets
/// a new, larger ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CollectingPrompt { span: Span, ticket: Ticket },
    AwaitingGeneration { span: Span, ticket: Ticket },
}

impl Phase {
    fn in_flight(&self) -> Option<(Span, Ticket)> {
        match *self {
            Phase::Idle => None,
            Phase::CollectingPrompt { span, ticket }
            | Phase::AwaitingGeneration { span, ticket } => Some((span, ticket)),
        }
    }
}

/// What the driver should do after [`RefactorSession::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Collect a prompt and ask the generator.
    Ask(Ticket),
    /// Apply this cached response again; no prompt, no generation.
    Reuse(String),
    /// The same span already has an interaction in flight.
    Busy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("interaction {ticket} is no longer active")]
    Stale { ticket: Ticket },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedResponse {
    span: Span,
    text: String,
}

/// Interaction state for one editor view.
///
/// A single active slot: at most one interaction is in flight. Starting one
/// at another span cancels the current one, whose ticket then goes stale.
#[derive(Debug)]
pub struct RefactorSession {
    phase: Phase,
    last_ticket: u64,
    cached: Option<CachedResponse>,
}

impl Default for RefactorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RefactorSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            last_ticket: 0,
            cached: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_span(&self) -> Option<Span> {
        self.phase.in_flight().map(|(span, _)| span)
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Span of the cached response, if any.
    pub fn cached_span(&self) -> Option<Span> {
        self.cached.as_ref().map(|cached| cached.span)
    }

    pub fn action_label(&self, span: Span) -> &'static str {
        if self.cached_span() == Some(span) {
            SUGGEST_LABEL
        } else {
            ASK_LABEL
        }
    }

    pub fn invoke(&mut self, span: Span) -> Invocation {
        if let Some((active, ticket)) = self.phase.in_flight() {
            if active == span {
                tracing::debug!(%span, %ticket, "interaction already in flight");
                return Invocation::Busy;
            }
            tracing::info!(
                %ticket,
                from = %active,
                to = %span,
                "cancelling interaction for a new span"
            );
        }

        if let Some(cached) = &self.cached {
            if cached.span == span && self.phase == Phase::Idle {
                tracing::debug!(%span, "reusing cached response");
                return Invocation::Reuse(cached.text.clone());
            }
        }
        if self.cached_span().is_some_and(|cached| cached != span) {
            self.cached = None;
        }

        self.last_ticket += 1;
        let ticket = Ticket(self.last_ticket);
        self.phase = Phase::CollectingPrompt { span, ticket };
        Invocation::Ask(ticket)
    }

    pub fn prompt_received(&mut self, ticket: Ticket) -> Result<(), SessionError> {
        match self.phase {
            Phase::CollectingPrompt { span, ticket: current } if current == ticket => {
                self.phase = Phase::AwaitingGeneration { span, ticket };
                Ok(())
            }
            _ => Err(SessionError::Stale { ticket }),
        }
    }

    /// Abandon the interaction `ticket` without any edit.
    pub fn cancel(&mut self, ticket: Ticket) -> Result<(), SessionError> {
        match self.phase.in_flight() {
            Some((_, current)) if current == ticket => {
                self.phase = Phase::Idle;
                Ok(())
            }
            _ => Err(SessionError::Stale { ticket }),
        }
    }

    /// Finish the interaction `ticket`, returning its span.
    ///
    /// A stale ticket means the result belongs to a cancelled interaction
    /// and must be dropped.
    pub fn complete(&mut self, ticket: Ticket) -> Result<Span, SessionError> {
        match self.phase {
            Phase::AwaitingGeneration { span, ticket: current } if current == ticket => {
                self.phase = Phase::Idle;
                Ok(span)
            }
            _ => Err(SessionError::Stale { ticket }),
        }
    }

    /// Remember a successfully applied response for reuse at `span`.
    pub fn record_applied(&mut self, span: Span, text: impl Into<String>) {
        self.cached = Some(CachedResponse {
            span,
            text: text.into(),
        });
    }

    pub fn forget_cached(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(session: &mut RefactorSession, span: Span) -> Ticket {
        match session.invoke(span) {
            Invocation::Ask(ticket) => ticket,
            other => panic!("expected Ask, got {other:?}"),
        }
    }

    #[test]
    fn full_cycle_returns_to_idle() {
        let mut session = RefactorSession::new();
        let span = Span::new(4, 9);

        let ticket = ask(&mut session, span);
        assert_eq!(session.phase(), Phase::CollectingPrompt { span, ticket });

        session.prompt_received(ticket).unwrap();
        assert_eq!(session.phase(), Phase::AwaitingGeneration { span, ticket });
        assert_eq!(session.active_span(), Some(span));

        assert_eq!(session.complete(ticket).unwrap(), span);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn same_span_in_flight_is_busy() {
        let mut session = RefactorSession::new();
        let span = Span::new(0, 3);
        let ticket = ask(&mut session, span);

        assert_eq!(session.invoke(span), Invocation::Busy);
        session.prompt_received(ticket).unwrap();
        assert_eq!(session.invoke(span), Invocation::Busy);
    }

    #[test]
    fn other_span_cancels_in_flight_interaction() {
        let mut session = RefactorSession::new();
        let first = ask(&mut session, Span::new(0, 3));
        session.prompt_received(first).unwrap();

        let second = ask(&mut session, Span::new(10, 12));
        assert!(second > first);

        assert_eq!(session.complete(first), Err(SessionError::Stale { ticket: first }));
        assert_eq!(session.active_span(), Some(Span::new(10, 12)));
    }

    #[test]
    fn transitions_need_the_right_phase() {
        let mut session = RefactorSession::new();
        let ticket = ask(&mut session, Span::new(0, 1));

        // still collecting the prompt
        assert!(session.complete(ticket).is_err());
        session.prompt_received(ticket).unwrap();
        assert!(session.prompt_received(ticket).is_err());
    }

    #[test]
    fn cancel_goes_idle() {
        let mut session = RefactorSession::new();
        let ticket = ask(&mut session, Span::new(0, 1));
        session.cancel(ticket).unwrap();
        assert!(!session.is_in_flight());
        assert!(session.cancel(ticket).is_err());
    }

    #[test]
    fn cached_response_is_reused_at_same_span() {
        let mut session = RefactorSession::new();
        let span = Span::new(2, 8);
        let ticket = ask(&mut session, span);
        session.prompt_received(ticket).unwrap();
        session.complete(ticket).unwrap();
        session.record_applied(span, "fn b() {}");

        assert_eq!(session.action_label(span), SUGGEST_LABEL);
        assert_eq!(session.invoke(span), Invocation::Reuse("fn b() {}".to_string()));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn other_span_discards_cache() {
        let mut session = RefactorSession::new();
        let span = Span::new(2, 8);
        session.record_applied(span, "fn b() {}");

        ask(&mut session, Span::new(20, 30));
        assert_eq!(session.cached_span(), None);
        assert_eq!(session.action_label(span), ASK_LABEL);
    }

    #[test]
    fn forget_cached_clears_reuse() {
        let mut session = RefactorSession::new();
        let span = Span::new(2, 8);
        session.record_applied(span, "fn b() {}");
        session.forget_cached();
        assert!(matches!(session.invoke(span), Invocation::Ask(_)));
    }
}
