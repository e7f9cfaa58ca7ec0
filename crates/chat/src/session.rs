// Session token lifetime management.
//
// Holds the current access token and proactively renews it one minute
// before expiry. Renewal failure is fatal to the session: the backend
// refuses a reissue only when the refresh grant itself has expired, which
// the client cannot recover from — the application logs out.

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use festa_common::types::TokenGrant;

/// How long before expiry renewal fires.
const RENEWAL_MARGIN: Duration = Duration::from_secs(60);

/// The reissue operation (the REST `/reissue` endpoint in production).
pub trait TokenRenewer {
    fn renew(&mut self) -> Result<TokenGrant>;
}

/// The current session credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub expires_in_seconds: u64,
}

/// A renewal timer for the host to arm.
///
/// The manager never reads the clock: the host sleeps for `delay` and then
/// calls `fire_renewal(generation)`. A stale generation (a newer
/// `set_session` re-armed the timer) is ignored, so at most one timer is
/// ever live no matter how the host schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalTimer {
    pub generation: u64,
    pub delay: Duration,
}

/// Session-level outcomes the application reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A renewal timer is armed; the host schedules `fire_renewal`.
    RenewalScheduled { delay: Duration },
    /// Renewal failed; the session is cleared and the application must
    /// log out. Not retried.
    LoggedOut,
}

/// Owns the access token and its renewal schedule.
pub struct SessionTokenManager<R: TokenRenewer> {
    renewer: R,
    session: Option<Session>,
    timer: Option<RenewalTimer>,
    generation: u64,
}

impl<R: TokenRenewer> SessionTokenManager<R> {
    pub fn new(renewer: R) -> Self {
        Self { renewer, session: None, timer: None, generation: 0 }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    /// The armed renewal timer, if any.
    pub fn pending_renewal(&self) -> Option<RenewalTimer> {
        self.timer
    }

    /// Replace the session and re-arm the renewal timer.
    ///
    /// Any prior timer is cancelled first, so repeated calls never leave
    /// two timers pending. A token already inside the renewal margin is
    /// renewed immediately instead of scheduled.
    pub fn set_session(
        &mut self,
        access_token: impl Into<String>,
        expires_in_seconds: u64,
    ) -> SessionEvent {
        self.timer = None;
        self.generation += 1;
        self.session =
            Some(Session { access_token: access_token.into(), expires_in_seconds });

        let lifetime = Duration::from_secs(expires_in_seconds);
        if lifetime <= RENEWAL_MARGIN {
            debug!(expires_in_seconds, "token lifetime within renewal margin, renewing now");
            return self.renew_now();
        }

        let delay = lifetime - RENEWAL_MARGIN;
        self.timer = Some(RenewalTimer { generation: self.generation, delay });
        debug!(?delay, "renewal timer armed");
        SessionEvent::RenewalScheduled { delay }
    }

    /// Drop the session and cancel any pending timer.
    pub fn clear(&mut self) {
        self.session = None;
        self.timer = None;
        self.generation += 1;
    }

    /// Host callback for an elapsed renewal timer.
    ///
    /// Returns `None` when the firing timer was superseded or cancelled.
    pub fn fire_renewal(&mut self, generation: u64) -> Option<SessionEvent> {
        match self.timer {
            Some(timer) if timer.generation == generation => {}
            _ => {
                debug!(generation, "stale renewal timer ignored");
                return None;
            }
        }
        self.timer = None;
        Some(self.renew_now())
    }

    fn renew_now(&mut self) -> SessionEvent {
        match self.renewer.renew() {
            Ok(grant) => {
                info!("access token renewed");
                self.set_session(grant.access_token, grant.expires_in_seconds)
            }
            Err(error) => {
                warn!(%error, "token renewal failed, forcing logout");
                self.clear();
                SessionEvent::LoggedOut
            }
        }
    }
}
