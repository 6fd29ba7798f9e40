//! Recording fakes for every collaborator, shared by unit tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::mpsc::UnboundedSender;

use crate::engine::{Outcome, SessionId, SessionObserver};
use crate::geometry::{Point, Rect};
use crate::provider::hints::StaticElement;
use crate::provider::{
    CursorVisibility, EventLogger, Hint, HintRequest, HintSource, InputEventSource,
    InputSubscription, KeyGrab, Overlay, OverlayRenderer, OverlayStyle, PointerDriver,
    ProviderError, ProviderSet, RawKeyEvent,
};

/// A hint with the given label and frames.
pub fn element(label: &str, frame: Option<Rect>, clipped_frame: Option<Rect>) -> Hint {
    Hint::new(
        Arc::new(StaticElement {
            frame,
            clipped_frame,
        }),
        label,
    )
}

/// A hint with a 10x10 frame at the origin.
pub fn hint(label: &str) -> Hint {
    element(label, Some(Rect::new(0.0, 0.0, 10.0, 10.0)), None)
}

/// Collaborator calls, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CursorHide,
    CursorShow,
    OverlayOpen(Rect),
    OverlayHints(Vec<String>),
    OverlayPrefix(String),
    OverlayRotate,
    OverlayClose,
    Query,
    Subscribe,
    Release,
    Event(String),
}

type Log = Arc<Mutex<Vec<Call>>>;

fn record(log: &Log, call: Call) {
    log.lock().unwrap().push(call);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerCall {
    Move(Point),
    Primary(Point),
    Secondary(Point),
    DoublePrimary(Point),
}

#[derive(Default)]
pub struct RecordingPointer {
    calls: Mutex<Vec<PointerCall>>,
    fail: bool,
}

impl RecordingPointer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PointerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: PointerCall) -> Result<(), ProviderError> {
        if self.fail {
            return Err(ProviderError::Pointer("injected failure".into()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl PointerDriver for RecordingPointer {
    fn move_to(&self, point: Point) -> Result<(), ProviderError> {
        self.push(PointerCall::Move(point))
    }

    fn primary_click(&self, point: Point) -> Result<(), ProviderError> {
        self.push(PointerCall::Primary(point))
    }

    fn secondary_click(&self, point: Point) -> Result<(), ProviderError> {
        self.push(PointerCall::Secondary(point))
    }

    fn double_primary_click(&self, point: Point) -> Result<(), ProviderError> {
        self.push(PointerCall::DoublePrimary(point))
    }
}

struct FakeHints {
    log: Log,
    result: Result<Vec<Hint>, ProviderError>,
}

impl HintSource for FakeHints {
    fn query(&self, _request: HintRequest) -> BoxFuture<'static, Result<Vec<Hint>, ProviderError>> {
        record(&self.log, Call::Query);
        Box::pin(futures::future::ready(self.result.clone()))
    }
}

struct FakeOverlayRenderer {
    log: Log,
}

impl OverlayRenderer for FakeOverlayRenderer {
    fn open(&self, display: Rect, _style: OverlayStyle) -> Box<dyn Overlay> {
        record(&self.log, Call::OverlayOpen(display));
        Box::new(FakeOverlay {
            log: self.log.clone(),
        })
    }
}

struct FakeOverlay {
    log: Log,
}

impl Overlay for FakeOverlay {
    fn set_hints(&mut self, hints: &[Hint]) {
        let labels = hints.iter().map(|h| h.label().to_string()).collect();
        record(&self.log, Call::OverlayHints(labels));
    }

    fn set_typed_prefix(&mut self, prefix: &str) {
        record(&self.log, Call::OverlayPrefix(prefix.to_string()));
    }

    fn rotate(&mut self) {
        record(&self.log, Call::OverlayRotate);
    }

    fn close(self: Box<Self>) {
        record(&self.log, Call::OverlayClose);
    }
}

type SenderSlot = Arc<Mutex<Option<UnboundedSender<RawKeyEvent>>>>;

struct FakeInput {
    log: Log,
    sender: SenderSlot,
    available: bool,
}

impl InputEventSource for FakeInput {
    fn subscribe(&self) -> Result<InputSubscription, ProviderError> {
        if !self.available {
            return Err(ProviderError::Input("keyboard already grabbed".into()));
        }
        record(&self.log, Call::Subscribe);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        Ok(InputSubscription {
            events: rx,
            grab: Box::new(FakeGrab {
                log: self.log.clone(),
                sender: self.sender.clone(),
            }),
        })
    }
}

struct FakeGrab {
    log: Log,
    sender: SenderSlot,
}

impl KeyGrab for FakeGrab {
    fn release(self: Box<Self>) {
        record(&self.log, Call::Release);
        self.sender.lock().unwrap().take();
    }
}

struct FakeCursor {
    log: Log,
}

impl CursorVisibility for FakeCursor {
    fn hide(&self) {
        record(&self.log, Call::CursorHide);
    }

    fn show(&self) {
        record(&self.log, Call::CursorShow);
    }
}

struct FakeTelemetry {
    log: Log,
}

impl EventLogger for FakeTelemetry {
    fn log_event(&self, name: &str, _properties: &[(&str, String)]) {
        record(&self.log, Call::Event(name.to_string()));
    }
}

/// Owns a full set of fakes sharing one call log.
pub struct Harness {
    log: Log,
    sender: SenderSlot,
    result: Result<Vec<Hint>, ProviderError>,
    input_available: bool,
    pub pointer: Arc<RecordingPointer>,
}

impl Harness {
    pub fn new(hints: Vec<Hint>) -> Self {
        Self {
            log: Log::default(),
            sender: SenderSlot::default(),
            result: Ok(hints),
            input_available: true,
            pointer: Arc::new(RecordingPointer::default()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn without_input(mut self) -> Self {
        self.input_available = false;
        self
    }

    pub fn with_failing_pointer(mut self) -> Self {
        self.pointer = Arc::new(RecordingPointer::failing());
        self
    }

    pub fn providers(&self) -> ProviderSet {
        ProviderSet {
            hints: Arc::new(FakeHints {
                log: self.log.clone(),
                result: self.result.clone(),
            }),
            overlay: Arc::new(FakeOverlayRenderer {
                log: self.log.clone(),
            }),
            input: Arc::new(FakeInput {
                log: self.log.clone(),
                sender: self.sender.clone(),
                available: self.input_available,
            }),
            pointer: self.pointer.clone(),
            cursor: Arc::new(FakeCursor {
                log: self.log.clone(),
            }),
            telemetry: Arc::new(FakeTelemetry {
                log: self.log.clone(),
            }),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.log.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn events(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Event(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Deliver a key event to the current subscription. Returns `false`
    /// if nobody is subscribed.
    pub fn send(&self, event: RawKeyEvent) -> bool {
        match self.sender.lock().unwrap().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Close the event stream as if the platform source died.
    pub fn close_input(&self) {
        self.sender.lock().unwrap().take();
    }

    pub fn is_subscribed(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }
}

/// Records every end-of-session notification.
#[derive(Default)]
pub struct RecordingObserver {
    ended: Mutex<Vec<(SessionId, Outcome)>>,
}

impl RecordingObserver {
    pub fn ended(&self) -> Vec<(SessionId, Outcome)> {
        self.ended.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn session_ended(&self, id: SessionId, outcome: &Outcome) {
        self.ended.lock().unwrap().push((id, outcome.clone()));
    }
}
