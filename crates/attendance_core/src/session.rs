//! Session boundary and auth-state event source.
//!
//! # Responsibility
//! - Provide the placeholder login used by the presentation layer.
//! - Hold opaque access/refresh tokens for the store boundary.
//! - Publish auth-state changes to subscribers.
//!
//! # Invariants
//! - `login` accepts any pair of non-empty credentials. It is NOT a security
//!   boundary and must be replaced before anything depends on it.
//! - Dropping a `SessionSubscription` releases it.
//! - Token values are never logged.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

/// Cookie name carrying the signed-in identifier.
pub const SESSION_COOKIE_NAME: &str = "user";

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Cookie attributes set on successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: &'static str,
    pub value: String,
    pub secure: bool,
    pub http_only: bool,
}

/// Opaque credential pair for the store boundary.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl SessionTokens {
    fn issue() -> Self {
        Self {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
        }
    }
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identifier: String,
    pub cookie: SessionCookie,
    pub tokens: SessionTokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    MissingCredentials,
}

impl Display for LoginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "Invalid email or password"),
        }
    }
}

impl Error for LoginError {}

/// Accepts any non-empty identifier/secret pair.
pub fn login(identifier: &str, secret: &str) -> Result<Session, LoginError> {
    let identifier = identifier.trim();
    if identifier.is_empty() || secret.trim().is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    Ok(Session {
        identifier: identifier.to_string(),
        cookie: SessionCookie {
            name: SESSION_COOKIE_NAME,
            value: identifier.to_string(),
            secure: true,
            http_only: true,
        },
        tokens: SessionTokens::issue(),
    })
}

/// Auth-state change published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { identifier: String },
    TokenRefreshed,
    SignedOut,
}

/// Broadcast source of `SessionEvent`s.
#[derive(Debug, Clone)]
pub struct SessionNotifier {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for SessionNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes `event`; returns how many subscribers received it.
    pub fn publish(&self, event: SessionEvent) -> usize {
        // No subscribers is not an error for a notifier.
        self.sender.send(event).unwrap_or(0)
    }
}

/// Scoped subscription to session events. Released on drop.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Drains every event published since the last call, without blocking.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("event=session_lagged module=session status=warn skipped={skipped}");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }
}

/// Owns the current session and announces its changes.
#[derive(Debug, Default)]
pub struct SessionManager {
    notifier: SessionNotifier,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(notifier: SessionNotifier) -> Self {
        Self {
            notifier,
            current: Mutex::new(None),
        }
    }

    pub fn notifier(&self) -> &SessionNotifier {
        &self.notifier
    }

    pub fn current(&self) -> Option<Session> {
        self.current.lock().ok().and_then(|session| session.clone())
    }

    pub fn login(&self, identifier: &str, secret: &str) -> Result<Session, LoginError> {
        let session = match login(identifier, secret) {
            Ok(session) => session,
            Err(err) => {
                info!("event=session_login module=session status=rejected");
                return Err(err);
            }
        };

        self.replace(Some(session.clone()));
        info!("event=session_login module=session status=ok");
        self.notifier.publish(SessionEvent::SignedIn {
            identifier: session.identifier.clone(),
        });
        Ok(session)
    }

    /// Rotates the opaque token pair of the active session.
    ///
    /// Returns `false` when nobody is signed in.
    pub fn refresh(&self) -> bool {
        let Ok(mut current) = self.current.lock() else {
            return false;
        };
        let Some(session) = current.as_mut() else {
            return false;
        };
        session.tokens = SessionTokens::issue();
        drop(current);

        self.notifier.publish(SessionEvent::TokenRefreshed);
        true
    }

    pub fn logout(&self) {
        if self.replace(None).is_some() {
            info!("event=session_logout module=session status=ok");
            self.notifier.publish(SessionEvent::SignedOut);
        }
    }

    fn replace(&self, session: Option<Session>) -> Option<Session> {
        match self.current.lock() {
            Ok(mut current) => std::mem::replace(&mut *current, session),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), session),
        }
    }
}
