//! Disambiguation session — one activate-to-teardown run of hint mode.
//!
//! A session moves through `Idle → Querying → Active → Terminated`.
//! Resources that only exist mid-session (the overlay, the hidden
//! cursor, the keyboard grab, the hint list) live inside the phase that
//! owns them, so they are released by replacing the phase and cannot be
//! reached once the session has ended.
//!
//! All transitions run on the task driving the session. The hint query
//! is the only work that leaves it: [`Session::activate`] hands out a
//! [`PendingQuery`] and the caller feeds its result back through
//! [`Session::complete_query`].

use std::fmt;
use std::sync::Weak;

use futures::future::BoxFuture;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::action::{self, ActionError};
use super::intent::{self, HintAction, Intent};
use super::screen::{self, Display};
use crate::config::HintConfig;
use crate::geometry::Rect;
use crate::provider::{
    AppHandle, HiddenCursor, Hint, HintRequest, KeyGrab, Overlay, OverlayStyle, ProviderError,
    ProviderSet, RawKeyEvent, WindowHandle,
};

/// Identity of one session. Asynchronous results carry it so a result
/// can never be applied to a different session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The user pressed escape.
    Exited,
    /// Deactivated from outside, or dropped while live.
    Cancelled,
    /// The typed prefix matched no label.
    Deadend { prefix: String },
    /// A label was typed in full.
    Resolved { label: String, action: HintAction },
    /// The Hint Source reported an error.
    QueryFailed(String),
    /// Hints arrived but the keyboard could not be captured.
    InputUnavailable(String),
    /// There was no display to show the overlay on.
    NoDisplay,
}

/// Result of feeding one key event or intent to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing happened: no intent, or the session is not active.
    Ignored,
    /// The session is still active.
    Pending,
    /// The session ended with this outcome.
    Finished(Outcome),
}

/// Coarse lifecycle phase, for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Querying,
    Active,
    Terminated,
}

/// Receives the end-of-session notification. Held weakly by the session.
pub trait SessionObserver: Send + Sync {
    fn session_ended(&self, id: SessionId, outcome: &Outcome);
}

/// The window a session targets.
#[derive(Debug, Clone, Copy)]
pub struct TargetWindow {
    pub handle: WindowHandle,
    /// Window frame in global coordinates.
    pub frame: Rect,
}

/// What hint mode was activated for.
#[derive(Debug, Clone, Copy)]
pub struct SessionTarget {
    pub app: AppHandle,
    pub window: Option<TargetWindow>,
}

/// The outstanding hint query of a session.
#[must_use = "the query result must be passed back to Session::complete_query"]
pub struct PendingQuery {
    pub session: SessionId,
    pub hints: BoxFuture<'static, Result<Vec<Hint>, ProviderError>>,
}

/// Errors a session step can return.
///
/// Only pointer-level failures surface here. They happen after teardown,
/// so the session is already terminated when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("hint action failed: {0}")]
    Action(#[from] ActionError),
}

/// Result of matching the typed prefix against the hint set.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// No label starts with the prefix.
    Deadend,
    /// A label equals the prefix. Wins even if longer labels share it.
    Resolved(&'a Hint),
    /// This many labels start with the prefix; none equals it.
    Ambiguous(usize),
}

/// Match `typed` (compared uppercase) against `hints`.
pub fn resolve<'a>(hints: &'a [Hint], typed: &str) -> Resolution<'a> {
    let prefix = typed.to_uppercase();
    let mut candidates = 0;

    for hint in hints {
        if hint.label() == prefix {
            return Resolution::Resolved(hint);
        }
        if hint.label().starts_with(&prefix) {
            candidates += 1;
        }
    }

    if candidates == 0 {
        Resolution::Deadend
    } else {
        Resolution::Ambiguous(candidates)
    }
}

/// Overlay plus hidden cursor: what becomes visible on activation.
struct Shown {
    overlay: Box<dyn Overlay>,
    cursor: HiddenCursor,
}

impl Shown {
    fn dispose(self) {
        self.overlay.close();
        drop(self.cursor);
    }
}

struct ActiveState {
    shown: Shown,
    grab: Box<dyn KeyGrab>,
    hints: Vec<Hint>,
    typed: String,
}

enum Phase {
    Idle,
    Querying(Shown),
    Active(ActiveState),
    Terminated(Outcome),
}

/// One hint mode session.
pub struct Session {
    id: SessionId,
    target: SessionTarget,
    displays: Vec<Display>,
    config: HintConfig,
    providers: ProviderSet,
    observer: Option<Weak<dyn SessionObserver>>,
    phase: Phase,
}

impl Session {
    pub fn new(
        target: SessionTarget,
        displays: Vec<Display>,
        config: HintConfig,
        providers: ProviderSet,
        observer: Option<Weak<dyn SessionObserver>>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            target,
            displays,
            config,
            providers,
            observer,
            phase: Phase::Idle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Idle => PhaseKind::Idle,
            Phase::Querying(_) => PhaseKind::Querying,
            Phase::Active(_) => PhaseKind::Active,
            Phase::Terminated(_) => PhaseKind::Terminated,
        }
    }

    /// The typed prefix, as typed. Only exists while active.
    pub fn typed_prefix(&self) -> Option<&str> {
        match &self.phase {
            Phase::Active(active) => Some(&active.typed),
            _ => None,
        }
    }

    /// The captured hint set. Only exists while active.
    pub fn hints(&self) -> Option<&[Hint]> {
        match &self.phase {
            Phase::Active(active) => Some(&active.hints),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.phase {
            Phase::Terminated(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Start the session: pick a display, hide the cursor, show an empty
    /// overlay and issue the hint query.
    ///
    /// Returns `None` if the session was already started, or if there is
    /// no display (the session then ends with [`Outcome::NoDisplay`]).
    pub fn activate(&mut self) -> Option<PendingQuery> {
        if !matches!(self.phase, Phase::Idle) {
            debug!(session = %self.id, phase = ?self.phase(), "activate ignored");
            return None;
        }

        let window_frame = self.target.window.map(|w| w.frame);
        let Some(display) = screen::select_display(window_frame, &self.displays) else {
            warn!(session = %self.id, "no display to show hints on");
            self.teardown(Outcome::NoDisplay);
            return None;
        };

        let cursor = HiddenCursor::hide(self.providers.cursor.clone());
        let overlay = self.providers.overlay.open(
            display,
            OverlayStyle {
                text_size: self.config.text_size,
            },
        );
        self.phase = Phase::Querying(Shown { overlay, cursor });

        info!(
            session = %self.id,
            app = self.target.app.0,
            window = ?self.target.window.map(|w| w.handle),
            "hint mode activated"
        );
        self.log_event(
            "hint_mode.activated",
            &[
                ("app", self.target.app.0.to_string()),
                ("has_window", self.target.window.is_some().to_string()),
            ],
        );

        let request = HintRequest {
            app: self.target.app,
            window: self.target.window.map(|w| w.handle),
            alphabet: self.config.alphabet.clone(),
        };

        Some(PendingQuery {
            session: self.id,
            hints: self.providers.hints.query(request),
        })
    }

    /// Apply the hint query result.
    ///
    /// On success the session becomes active and the key event stream is
    /// returned; feed its events to [`Session::handle_key`]. Results for
    /// another session, or arriving after this one left `Querying`, are
    /// discarded.
    pub fn complete_query(
        &mut self,
        id: SessionId,
        result: Result<Vec<Hint>, ProviderError>,
    ) -> Option<UnboundedReceiver<RawKeyEvent>> {
        if id != self.id {
            debug!(
                session = %self.id,
                result_for = %id,
                "discarding hint result for another session"
            );
            return None;
        }

        let shown = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Querying(shown) => shown,
            other => {
                self.phase = other;
                debug!(session = %self.id, phase = ?self.phase(), "discarding late hint result");
                return None;
            }
        };

        let hints = match result {
            Ok(hints) => hints,
            Err(e) => {
                error!(session = %self.id, error = %e, "hint query failed");
                self.phase = Phase::Querying(shown);
                self.log_event("hint_mode.query_failed", &[("error", e.to_string())]);
                self.teardown(Outcome::QueryFailed(e.to_string()));
                return None;
            }
        };

        let subscription = match self.providers.input.subscribe() {
            Ok(subscription) => subscription,
            Err(e) => {
                error!(session = %self.id, error = %e, "cannot capture keyboard");
                self.phase = Phase::Querying(shown);
                self.teardown(Outcome::InputUnavailable(e.to_string()));
                return None;
            }
        };

        let mut shown = shown;
        shown.overlay.set_hints(&hints);
        shown.overlay.set_typed_prefix("");

        info!(session = %self.id, hints = hints.len(), "hint mode active");
        self.phase = Phase::Active(ActiveState {
            shown,
            grab: subscription.grab,
            hints,
            typed: String::new(),
        });

        Some(subscription.events)
    }

    /// Classify a raw key event and apply the resulting intent.
    pub fn handle_key(&mut self, event: &RawKeyEvent) -> Result<Step, SessionError> {
        match intent::classify(event) {
            Some(intent) => self.apply(intent),
            None => {
                trace!(session = %self.id, ?event, "key ignored");
                Ok(Step::Ignored)
            }
        }
    }

    /// Fold one intent into the session.
    ///
    /// On resolution the session is torn down first and the pointer
    /// action runs afterwards; a pointer failure is returned as an error
    /// with the session already terminated.
    pub fn apply(&mut self, intent: Intent) -> Result<Step, SessionError> {
        let Phase::Active(active) = &mut self.phase else {
            debug!(session = %self.id, ?intent, "intent outside active phase ignored");
            return Ok(Step::Ignored);
        };

        match intent {
            Intent::Exit => {
                let prefix = active.typed.clone();
                self.log_event(
                    "hint_mode.deactivated",
                    &[("reason", "exit".into()), ("prefix", prefix)],
                );
                self.teardown(Outcome::Exited);
                Ok(Step::Finished(Outcome::Exited))
            }

            Intent::Backspace => {
                active.typed.pop();
                active.shown.overlay.set_typed_prefix(&active.typed);
                Ok(Step::Pending)
            }

            Intent::Rotate => {
                active.shown.overlay.rotate();
                let prefix = active.typed.clone();
                self.log_event("hint_mode.rotated", &[("prefix", prefix)]);
                Ok(Step::Pending)
            }

            Intent::Advance { ch, action } => {
                active.typed.push(ch);

                let resolved = match resolve(&active.hints, &active.typed) {
                    Resolution::Ambiguous(candidates) => {
                        trace!(
                            session = %self.id,
                            prefix = %active.typed,
                            candidates,
                            "prefix narrowed"
                        );
                        active.shown.overlay.set_typed_prefix(&active.typed);
                        return Ok(Step::Pending);
                    }
                    Resolution::Deadend => None,
                    Resolution::Resolved(hint) => Some(hint.clone()),
                };

                let prefix = active.typed.clone();
                let hint_count = active.hints.len().to_string();

                let Some(hint) = resolved else {
                    info!(session = %self.id, %prefix, "no hint matches");
                    self.log_event(
                        "hint_mode.deadend",
                        &[("prefix", prefix.clone()), ("hints", hint_count)],
                    );
                    let outcome = Outcome::Deadend { prefix };
                    self.teardown(outcome.clone());
                    return Ok(Step::Finished(outcome));
                };

                info!(
                    session = %self.id,
                    label = hint.label(),
                    action = action.as_str(),
                    "hint resolved"
                );
                self.log_event(
                    "hint_mode.resolved",
                    &[
                        ("label", hint.label().to_string()),
                        ("action", action.as_str().to_string()),
                        ("hints", hint_count),
                    ],
                );
                let outcome = Outcome::Resolved {
                    label: hint.label().to_string(),
                    action,
                };
                self.teardown(outcome.clone());

                action::execute(&hint, action, self.providers.pointer.as_ref())?;
                Ok(Step::Finished(outcome))
            }
        }
    }

    /// End the session from outside. Returns `false` (and does nothing)
    /// unless the session is querying or active.
    pub fn deactivate(&mut self) -> bool {
        let prefix = match &self.phase {
            Phase::Querying(_) => String::new(),
            Phase::Active(active) => active.typed.clone(),
            Phase::Idle | Phase::Terminated(_) => {
                debug!(session = %self.id, phase = ?self.phase(), "deactivate ignored");
                return false;
            }
        };

        self.log_event(
            "hint_mode.deactivated",
            &[("reason", "cancelled".into()), ("prefix", prefix)],
        );
        self.teardown(Outcome::Cancelled);
        true
    }

    /// Release everything the session holds and notify the observer.
    ///
    /// The phase is switched to `Terminated` before any collaborator is
    /// called, so a re-entrant call from one of them is a no-op.
    fn teardown(&mut self, outcome: Outcome) {
        if matches!(self.phase, Phase::Terminated(_)) {
            return;
        }

        match std::mem::replace(&mut self.phase, Phase::Terminated(outcome.clone())) {
            Phase::Idle | Phase::Terminated(_) => {}
            Phase::Querying(shown) => shown.dispose(),
            Phase::Active(active) => {
                active.grab.release();
                active.shown.dispose();
            }
        }

        debug!(session = %self.id, ?outcome, "session torn down");

        if let Some(observer) = self.observer.as_ref().and_then(Weak::upgrade) {
            observer.session_ended(self.id, &outcome);
        }
    }

    fn log_event(&self, name: &str, properties: &[(&str, String)]) {
        let mut props = Vec::with_capacity(properties.len() + 1);
        props.push(("session", self.id.to_string()));
        props.extend(properties.iter().cloned());
        self.providers.telemetry.log_event(name, &props);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown(Outcome::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::provider::{Key, Modifiers};
    use crate::test_support::{Call, Harness, PointerCall, RecordingObserver, element, hint};
    use std::sync::Arc;

    fn display() -> Vec<Display> {
        vec![Display {
            frame: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            primary: true,
        }]
    }

    fn target() -> SessionTarget {
        SessionTarget {
            app: AppHandle(7),
            window: None,
        }
    }

    fn session(harness: &Harness) -> Session {
        Session::new(
            target(),
            display(),
            HintConfig::default(),
            harness.providers(),
            None,
        )
    }

    /// Activate and apply the harness's query result.
    async fn active(harness: &Harness) -> Session {
        let mut s = session(harness);
        let pending = s.activate().expect("first activate starts the session");
        let result = pending.hints.await;
        s.complete_query(pending.session, result)
            .expect("query succeeds");
        assert_eq!(s.phase(), PhaseKind::Active);
        s
    }

    fn type_char(s: &mut Session, c: char) -> Step {
        s.handle_key(&RawKeyEvent::char(c, Modifiers::NONE)).unwrap()
    }

    #[test]
    fn resolve_prefers_exact_match() {
        let hints = vec![hint("A"), hint("AB")];
        assert!(matches!(resolve(&hints, "a"), Resolution::Resolved(h) if h.label() == "A"));
        assert!(matches!(resolve(&hints, "AB"), Resolution::Resolved(h) if h.label() == "AB"));
        assert!(matches!(resolve(&hints, ""), Resolution::Ambiguous(2)));
        assert!(matches!(resolve(&hints, "B"), Resolution::Deadend));
    }

    #[tokio::test]
    async fn activation_hides_cursor_shows_overlay_and_queries_once() {
        let harness = Harness::new(vec![hint("A")]);
        let mut s = session(&harness);

        let pending = s.activate().unwrap();
        assert_eq!(s.phase(), PhaseKind::Querying);
        assert!(s.activate().is_none(), "second activate is a no-op");

        assert_eq!(
            harness.calls(),
            vec![
                Call::CursorHide,
                Call::OverlayOpen(Rect::new(0.0, 0.0, 1920.0, 1080.0)),
                Call::Event("hint_mode.activated".into()),
                Call::Query,
            ]
        );
        assert_eq!(harness.count(&Call::Subscribe), 0, "no key listening while querying");

        let result = pending.hints.await;
        s.complete_query(pending.session, result).unwrap();
        assert_eq!(harness.count(&Call::Query), 1);
        assert_eq!(s.typed_prefix(), Some(""));
        assert_eq!(s.hints().map(|h| h.len()), Some(1));
    }

    #[tokio::test]
    async fn query_success_pushes_hints_then_listens() {
        let harness = Harness::new(vec![hint("AB"), hint("AC")]);
        let _s = active(&harness).await;

        let calls = harness.calls();
        let tail = &calls[calls.len() - 3..];
        assert_eq!(
            tail,
            &[
                Call::Subscribe,
                Call::OverlayHints(vec!["AB".into(), "AC".into()]),
                Call::OverlayPrefix(String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn exact_match_wins_over_longer_label() {
        let harness = Harness::new(vec![
            element("A", Some(Rect::new(0.0, 0.0, 10.0, 10.0)), None),
            element("AB", Some(Rect::new(100.0, 100.0, 10.0, 10.0)), None),
        ]);
        let mut s = active(&harness).await;

        let step = type_char(&mut s, 'a');

        assert_eq!(
            step,
            Step::Finished(Outcome::Resolved {
                label: "A".into(),
                action: HintAction::Primary
            })
        );
        let at = Point::new(5.0, 5.0);
        assert_eq!(
            harness.pointer.calls(),
            vec![PointerCall::Move(at), PointerCall::Primary(at)]
        );
    }

    #[tokio::test]
    async fn ambiguous_prefix_stays_active_then_resolves() {
        let harness = Harness::new(vec![
            element("AB", Some(Rect::new(0.0, 0.0, 10.0, 10.0)), None),
            element("AC", Some(Rect::new(50.0, 50.0, 10.0, 10.0)), None),
        ]);
        let mut s = active(&harness).await;

        assert_eq!(type_char(&mut s, 'a'), Step::Pending);
        assert_eq!(s.phase(), PhaseKind::Active);
        assert_eq!(s.typed_prefix(), Some("a"));
        assert_eq!(harness.calls().last(), Some(&Call::OverlayPrefix("a".into())));
        assert!(harness.pointer.calls().is_empty());

        let step = type_char(&mut s, 'b');
        assert!(matches!(
            step,
            Step::Finished(Outcome::Resolved { ref label, .. }) if label == "AB"
        ));
        assert_eq!(harness.pointer.calls()[0], PointerCall::Move(Point::new(5.0, 5.0)));
    }

    #[tokio::test]
    async fn deadend_terminates_without_action() {
        let harness = Harness::new(vec![hint("A")]);
        let mut s = active(&harness).await;

        let step = type_char(&mut s, 'z');

        assert_eq!(
            step,
            Step::Finished(Outcome::Deadend { prefix: "z".into() })
        );
        assert_eq!(s.phase(), PhaseKind::Terminated);
        assert!(harness.pointer.calls().is_empty());
        assert!(harness.events().contains(&"hint_mode.deadend".to_string()));
        assert_eq!(harness.count(&Call::CursorShow), 1);
    }

    #[tokio::test]
    async fn backspace_on_empty_prefix_is_noop() {
        let harness = Harness::new(vec![hint("AB"), hint("AC")]);
        let mut s = active(&harness).await;

        let step = s.handle_key(&RawKeyEvent::named(Key::Delete)).unwrap();

        assert_eq!(step, Step::Pending);
        assert_eq!(s.phase(), PhaseKind::Active);
        assert_eq!(s.typed_prefix(), Some(""));
    }

    #[tokio::test]
    async fn backspace_removes_last_character() {
        let harness = Harness::new(vec![hint("ASD"), hint("ASF")]);
        let mut s = active(&harness).await;

        type_char(&mut s, 'a');
        type_char(&mut s, 's');
        s.handle_key(&RawKeyEvent::named(Key::Delete)).unwrap();

        assert_eq!(s.typed_prefix(), Some("a"));
        assert_eq!(harness.calls().last(), Some(&Call::OverlayPrefix("a".into())));
    }

    #[tokio::test]
    async fn rotate_leaves_prefix_and_hints_alone() {
        let harness = Harness::new(vec![hint("AB"), hint("AC")]);
        let mut s = active(&harness).await;
        type_char(&mut s, 'a');

        let step = s.handle_key(&RawKeyEvent::named(Key::Space)).unwrap();

        assert_eq!(step, Step::Pending);
        assert_eq!(s.typed_prefix(), Some("a"));
        assert_eq!(s.hints().map(|h| h.len()), Some(2));
        assert_eq!(harness.count(&Call::OverlayRotate), 1);
        assert!(harness.events().contains(&"hint_mode.rotated".to_string()));
    }

    #[tokio::test]
    async fn exit_never_runs_action() {
        let harness = Harness::new(vec![hint("AB"), hint("AC")]);
        let mut s = active(&harness).await;
        type_char(&mut s, 'a');

        let step = s.handle_key(&RawKeyEvent::named(Key::Escape)).unwrap();

        assert_eq!(step, Step::Finished(Outcome::Exited));
        assert!(harness.pointer.calls().is_empty());
        assert!(harness.events().contains(&"hint_mode.deactivated".to_string()));
    }

    #[tokio::test]
    async fn teardown_order_releases_grab_then_overlay_then_cursor() {
        let harness = Harness::new(vec![hint("A")]);
        let observer = Arc::new(RecordingObserver::default());
        let weak: Weak<dyn SessionObserver> =
            Arc::downgrade(&observer) as Weak<dyn SessionObserver>;
        let mut s = Session::new(
            target(),
            display(),
            HintConfig::default(),
            harness.providers(),
            Some(weak),
        );
        let pending = s.activate().unwrap();
        let result = pending.hints.await;
        s.complete_query(pending.session, result).unwrap();

        s.handle_key(&RawKeyEvent::named(Key::Escape)).unwrap();

        let calls = harness.calls();
        let tail = &calls[calls.len() - 3..];
        assert_eq!(tail, &[Call::Release, Call::OverlayClose, Call::CursorShow]);
        assert_eq!(observer.ended(), vec![(s.id(), Outcome::Exited)]);
    }

    #[tokio::test]
    async fn secondary_modifier_right_clicks_same_point() {
        let harness = Harness::new(vec![element(
            "A",
            Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
            Some(Rect::new(10.0, 10.0, 20.0, 20.0)),
        )]);
        let mut s = active(&harness).await;

        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        s.handle_key(&RawKeyEvent::char('A', shift)).unwrap();

        let at = Point::new(20.0, 20.0);
        assert_eq!(
            harness.pointer.calls(),
            vec![PointerCall::Move(at), PointerCall::Secondary(at)]
        );
    }

    #[tokio::test]
    async fn keys_outside_active_phase_are_ignored() {
        let harness = Harness::new(vec![hint("A")]);
        let mut s = session(&harness);

        assert_eq!(type_char(&mut s, 'a'), Step::Ignored);
        let _pending = s.activate().unwrap();
        assert_eq!(type_char(&mut s, 'a'), Step::Ignored);
        assert!(harness.pointer.calls().is_empty());
    }

    #[tokio::test]
    async fn unclassified_key_changes_nothing() {
        let harness = Harness::new(vec![hint("AB"), hint("AC")]);
        let mut s = active(&harness).await;
        let before = harness.calls().len();

        let step = s.handle_key(&RawKeyEvent::named(Key::Other(0xffe1))).unwrap();

        assert_eq!(step, Step::Ignored);
        assert_eq!(s.typed_prefix(), Some(""));
        assert_eq!(harness.calls().len(), before);
    }

    #[tokio::test]
    async fn query_failure_restores_cursor_without_hints() {
        let harness = Harness::failing(ProviderError::Hints("boom".into()));
        let mut s = session(&harness);

        let pending = s.activate().unwrap();
        let result = pending.hints.await;
        let events = s.complete_query(pending.session, result);

        assert!(events.is_none());
        assert_eq!(s.outcome(), Some(&Outcome::QueryFailed("hints: boom".into())));
        assert_eq!(harness.count(&Call::CursorShow), 1);
        assert_eq!(harness.count(&Call::OverlayClose), 1);
        assert_eq!(harness.count(&Call::Subscribe), 0);
        assert!(!harness.calls().iter().any(|c| matches!(c, Call::OverlayHints(_))));
    }

    #[tokio::test]
    async fn input_failure_ends_session() {
        let harness = Harness::new(vec![hint("A")]).without_input();
        let mut s = session(&harness);

        let pending = s.activate().unwrap();
        let result = pending.hints.await;

        assert!(s.complete_query(pending.session, result).is_none());
        assert!(matches!(s.outcome(), Some(Outcome::InputUnavailable(_))));
        assert_eq!(harness.count(&Call::CursorShow), 1);
    }

    #[tokio::test]
    async fn stale_result_is_discarded() {
        let harness = Harness::new(vec![hint("A")]);
        let mut s = session(&harness);
        let mut other = session(&harness);

        let pending = s.activate().unwrap();
        let result = pending.hints.await;

        assert!(other.complete_query(pending.session, result.clone()).is_none());
        assert_eq!(other.phase(), PhaseKind::Idle);

        assert!(s.deactivate());
        assert!(s.complete_query(pending.session, result).is_none());
        assert_eq!(s.outcome(), Some(&Outcome::Cancelled));
        assert_eq!(harness.count(&Call::Subscribe), 0);
    }

    #[tokio::test]
    async fn deactivate_twice_tears_down_once() {
        let harness = Harness::new(vec![hint("AB"), hint("AC")]);
        let mut s = active(&harness).await;

        assert!(s.deactivate());
        assert!(!s.deactivate());
        drop(s);

        assert_eq!(harness.count(&Call::Release), 1);
        assert_eq!(harness.count(&Call::OverlayClose), 1);
        assert_eq!(harness.count(&Call::CursorShow), 1);
    }

    #[tokio::test]
    async fn activate_after_exit_is_noop() {
        let harness = Harness::new(vec![hint("AB")]);
        let mut s = active(&harness).await;
        s.handle_key(&RawKeyEvent::named(Key::Escape)).unwrap();
        assert_eq!(s.phase(), PhaseKind::Terminated);

        assert!(s.activate().is_none());
        assert!(!s.deactivate());

        assert_eq!(s.phase(), PhaseKind::Terminated);
        assert_eq!(s.outcome(), Some(&Outcome::Exited));
        assert_eq!(harness.count(&Call::Query), 1);
        assert_eq!(harness.count(&Call::CursorHide), 1);
        assert_eq!(harness.count(&Call::CursorShow), 1);
        assert_eq!(harness.count(&Call::OverlayOpen(display()[0].frame)), 1);
    }

    #[tokio::test]
    async fn dropping_live_session_restores_cursor() {
        let harness = Harness::new(vec![hint("A")]);
        let mut s = session(&harness);
        let _pending = s.activate().unwrap();

        drop(s);

        assert_eq!(harness.count(&Call::CursorHide), 1);
        assert_eq!(harness.count(&Call::CursorShow), 1);
        assert_eq!(harness.count(&Call::OverlayClose), 1);
    }

    #[tokio::test]
    async fn no_display_ends_before_hiding_cursor() {
        let harness = Harness::new(vec![hint("A")]);
        let mut s = Session::new(
            target(),
            Vec::new(),
            HintConfig::default(),
            harness.providers(),
            None,
        );

        assert!(s.activate().is_none());
        assert_eq!(s.outcome(), Some(&Outcome::NoDisplay));
        assert_eq!(harness.count(&Call::CursorHide), 0);
        assert_eq!(harness.count(&Call::Query), 0);
    }

    #[tokio::test]
    async fn pointer_failure_surfaces_after_teardown() {
        let harness = Harness::new(vec![hint("A")]).with_failing_pointer();
        let mut s = active(&harness).await;

        let err = type_char_result(&mut s, 'a').unwrap_err();

        assert!(matches!(err, SessionError::Action(ActionError::Pointer(_))));
        assert_eq!(s.phase(), PhaseKind::Terminated);
        assert_eq!(harness.count(&Call::CursorShow), 1);
    }

    fn type_char_result(s: &mut Session, c: char) -> Result<Step, SessionError> {
        s.handle_key(&RawKeyEvent::char(c, Modifiers::NONE))
    }
}
