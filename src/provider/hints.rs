//! HintSource trait — enumerates labelled targets for a session.
//!
//! Label assignment and element discovery belong to the source; the
//! engine only consumes the finished list.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;

use super::ProviderError;
use crate::geometry::Rect;

/// Opaque handle identifying the target application (a PID on X11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppHandle(pub u32);

/// Opaque handle identifying a top-level window (an XID on X11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u32);

/// An on-screen element a hint points at.
///
/// The Hint Source owns element lifetime; hints share it.
pub trait TargetElement: Send + Sync + fmt::Debug {
    /// The element's raw bounding frame, if known.
    fn frame(&self) -> Option<Rect>;

    /// The element's frame after intersection with clipping ancestors
    /// (scroll views, window bounds). Preferred for targeting.
    fn clipped_frame(&self) -> Option<Rect>;
}

/// A label bound to a target element.
#[derive(Debug, Clone)]
pub struct Hint {
    element: Arc<dyn TargetElement>,
    label: String,
}

impl Hint {
    /// Bind `label` to `element`. Labels are stored uppercase.
    pub fn new(element: Arc<dyn TargetElement>, label: &str) -> Self {
        Self {
            element,
            label: label.to_uppercase(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn element(&self) -> &dyn TargetElement {
        self.element.as_ref()
    }
}

/// Parameters of one hint query.
#[derive(Debug, Clone)]
pub struct HintRequest {
    pub app: AppHandle,
    pub window: Option<WindowHandle>,
    /// Configured alphabet, as given (case-insensitive).
    pub alphabet: String,
}

/// Asynchronously produces the hint list for a session.
///
/// The returned future resolves exactly once, to either the full ordered
/// list or a failure. It may be driven on any runtime worker; the
/// session applies its result on the control task.
pub trait HintSource: Send + Sync {
    fn query(&self, request: HintRequest) -> BoxFuture<'static, Result<Vec<Hint>, ProviderError>>;
}

/// A target read from a hints file: fixed frames, no live element.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticElement {
    #[serde(default)]
    pub frame: Option<Rect>,
    #[serde(default)]
    pub clipped_frame: Option<Rect>,
}

impl TargetElement for StaticElement {
    fn frame(&self) -> Option<Rect> {
        self.frame
    }

    fn clipped_frame(&self) -> Option<Rect> {
        self.clipped_frame
    }
}

#[derive(Debug, Deserialize)]
struct HintsFile {
    targets: Vec<TargetEntry>,
}

#[derive(Debug, Deserialize)]
struct TargetEntry {
    label: String,
    #[serde(flatten)]
    element: StaticElement,
}

/// Hint Source backed by a JSON file of pre-labelled targets.
///
/// ```json
/// { "targets": [ { "label": "AS", "frame": { "x": 0, "y": 0, "width": 10, "height": 10 } } ] }
/// ```
///
/// The file is re-read on every query, so an external enumerator can
/// rewrite it between sessions.
pub struct FileHintSource {
    path: PathBuf,
}

impl FileHintSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HintSource for FileHintSource {
    fn query(&self, request: HintRequest) -> BoxFuture<'static, Result<Vec<Hint>, ProviderError>> {
        let path = self.path.clone();
        Box::pin(async move {
            let raw = tokio::fs::read(&path)
                .await
                .map_err(|e| ProviderError::Hints(format!("read {}: {e}", path.display())))?;

            let file: HintsFile = serde_json::from_slice(&raw)
                .map_err(|e| ProviderError::Hints(format!("parse {}: {e}", path.display())))?;

            tracing::debug!(
                path = %path.display(),
                app = request.app.0,
                window = ?request.window,
                targets = file.targets.len(),
                "hints file loaded"
            );

            build_hints(file.targets, &request.alphabet)
        })
    }
}

/// Turn file entries into hints, rejecting labels the session could
/// never type and labels that collide.
fn build_hints(entries: Vec<TargetEntry>, alphabet: &str) -> Result<Vec<Hint>, ProviderError> {
    let allowed: HashSet<char> = alphabet.to_uppercase().chars().collect();
    let mut seen = HashSet::new();
    let mut hints = Vec::with_capacity(entries.len());

    for entry in entries {
        let label = entry.label.to_uppercase();
        if label.is_empty() {
            return Err(ProviderError::Hints("empty label".into()));
        }
        if let Some(bad) = label.chars().find(|c| !allowed.contains(c)) {
            return Err(ProviderError::Hints(format!(
                "label {label} uses {bad:?}, which is not in the alphabet"
            )));
        }
        if !seen.insert(label.clone()) {
            return Err(ProviderError::Hints(format!("duplicate label {label}")));
        }
        hints.push(Hint::new(Arc::new(entry.element), &label));
    }

    Ok(hints)
}
