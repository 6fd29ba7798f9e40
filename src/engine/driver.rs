//! Session driver — runs one session to completion on the current task.
//!
//! The hint query is spawned onto the runtime; its result, and every key
//! event, is applied back on the driving task, so the session itself is
//! only ever touched from one place.

use std::future::Future;

use tracing::{debug, warn};

use super::session::{Outcome, Session, SessionError, Step};
use crate::provider::ProviderError;

/// Activate `session` and drive it until it terminates or `shutdown`
/// completes, whichever comes first.
///
/// Keys typed while the query is outstanding are not captured. A
/// pointer failure after resolution is returned as an error; the session
/// has already been torn down by then.
pub async fn run<F>(mut session: Session, shutdown: F) -> Result<Outcome, SessionError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let Some(pending) = session.activate() else {
        return Ok(finished(&session));
    };
    let id = pending.session;
    let query = tokio::spawn(pending.hints);

    let result = tokio::select! {
        joined = query => joined.unwrap_or_else(|e| {
            Err(ProviderError::Hints(format!("hint query task failed: {e}")))
        }),
        () = &mut shutdown => {
            debug!(session = %id, "shutdown while querying hints");
            session.deactivate();
            return Ok(finished(&session));
        }
    };

    let Some(mut keys) = session.complete_query(id, result) else {
        return Ok(finished(&session));
    };

    loop {
        tokio::select! {
            event = keys.recv() => match event {
                Some(event) => {
                    if let Step::Finished(outcome) = session.handle_key(&event)? {
                        return Ok(outcome);
                    }
                }
                None => {
                    warn!(session = %id, "key event stream closed");
                    session.deactivate();
                    return Ok(finished(&session));
                }
            },
            () = &mut shutdown => {
                debug!(session = %id, "shutdown while active");
                session.deactivate();
                return Ok(finished(&session));
            }
        }
    }
}

fn finished(session: &Session) -> Outcome {
    session.outcome().cloned().unwrap_or(Outcome::Cancelled)
}
