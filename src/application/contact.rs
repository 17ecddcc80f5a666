use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::contact::{ContactErrors, ContactMessage};

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("contact form has invalid fields")]
    Invalid(ContactErrors),
    #[error("contact delivery failed: {0}")]
    Delivery(String),
}

/// Destination for accepted contact messages.
#[async_trait]
pub trait ContactSink: Send + Sync {
    async fn deliver(&self, message: &ContactMessage) -> Result<(), ContactError>;
}

#[derive(Clone)]
pub struct ContactService {
    sink: Option<Arc<dyn ContactSink>>,
}

impl ContactService {
    pub fn new(sink: Option<Arc<dyn ContactSink>>) -> Self {
        Self { sink }
    }

    pub async fn submit(&self, message: ContactMessage) -> Result<(), ContactError> {
        let errors = message.validate();
        if !errors.is_empty() {
            return Err(ContactError::Invalid(errors));
        }

        match &self.sink {
            Some(sink) => sink.deliver(&message).await,
            None => {
                info!(
                    target = "application::contact",
                    name = %message.name,
                    email = %message.email,
                    length = message.message.chars().count(),
                    "contact message received without a configured endpoint"
                );
                Ok(())
            }
        }
    }
}
