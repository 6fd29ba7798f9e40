//! HintModeController — owns the collaborators and hands out sessions.
//!
//! At most one session built by a controller is live at a time. The
//! session holds the controller weakly and tells it when it ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, info};

use super::screen::Display;
use super::session::{Outcome, Session, SessionId, SessionObserver, SessionTarget};
use crate::config::{ConfigError, HintConfig};
use crate::provider::ProviderSet;

pub struct HintModeController {
    providers: ProviderSet,
    config: HintConfig,
    live: AtomicBool,
    last: Mutex<Option<(SessionId, Outcome)>>,
}

impl HintModeController {
    /// Build a controller. The configuration is validated here and never
    /// re-read afterwards.
    pub fn new(providers: ProviderSet, config: HintConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        Ok(Arc::new(Self {
            providers,
            config,
            live: AtomicBool::new(false),
            last: Mutex::new(None),
        }))
    }

    /// Build a new session, or `None` while another one is live.
    ///
    /// The session is returned idle; call [`Session::activate`] (or hand
    /// it to [`super::driver::run`]) to start it.
    pub fn start_session(
        self: &Arc<Self>,
        target: SessionTarget,
        displays: Vec<Display>,
    ) -> Option<Session> {
        if self.live.swap(true, Ordering::AcqRel) {
            debug!("hint mode already active, activation ignored");
            return None;
        }

        let observer: Weak<dyn SessionObserver> = Arc::downgrade(self) as Weak<dyn SessionObserver>;
        Some(Session::new(
            target,
            displays,
            self.config.clone(),
            self.providers.clone(),
            Some(observer),
        ))
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// The most recent session's id and outcome.
    pub fn last_outcome(&self) -> Option<(SessionId, Outcome)> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionObserver for HintModeController {
    fn session_ended(&self, id: SessionId, outcome: &Outcome) {
        info!(session = %id, ?outcome, "hint mode session ended");
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some((id, outcome.clone()));
        self.live.store(false, Ordering::Release);
    }
}
