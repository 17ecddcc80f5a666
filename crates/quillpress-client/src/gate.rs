//! Session gate: reads that need a token wait here until the session is known.

use std::sync::Arc;

use tokio::sync::watch;

/// Two-state view of the caller's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// The session has not been looked up yet.
    Pending,
    /// The lookup finished; `None` means signed out.
    Resolved(Option<String>),
}

impl Credentials {
    pub fn is_pending(&self) -> bool {
        matches!(self, Credentials::Pending)
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Credentials::Resolved(Some(token)) => Some(token.as_str()),
            _ => None,
        }
    }
}

/// Publishes [`Credentials`] to every clone of the handle.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: Arc<watch::Sender<Credentials>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Credentials::Pending);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn resolved(token: Option<String>) -> Self {
        let (sender, _) = watch::channel(Credentials::Resolved(token));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Credentials {
        self.sender.borrow().clone()
    }

    pub fn resolve(&self, token: Option<String>) {
        self.sender.send_replace(Credentials::Resolved(token));
    }

    pub fn sign_out(&self) {
        self.resolve(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Credentials> {
        self.sender.subscribe()
    }

    /// Waits until the session leaves [`Credentials::Pending`] and returns the token, if any.
    pub async fn token(&self) -> Option<String> {
        let mut receiver = self.sender.subscribe();
        match receiver.wait_for(|credentials| !credentials.is_pending()).await {
            Ok(credentials) => credentials.token().map(str::to_string),
            Err(_) => None,
        }
    }
}
