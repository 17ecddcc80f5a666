//! Forwards accepted contact messages to an external JSON endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::application::contact::{ContactError, ContactSink};
use crate::domain::contact::ContactMessage;

#[derive(Clone, Debug)]
pub struct HttpContactSink {
    client: Client,
    endpoint: Url,
}

impl HttpContactSink {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, ContactError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ContactError::Delivery(err.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ContactSink for HttpContactSink {
    async fn deliver(&self, message: &ContactMessage) -> Result<(), ContactError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(message)
            .send()
            .await
            .map_err(|err| ContactError::Delivery(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContactError::Delivery(format!(
                "endpoint responded with status {status}"
            )));
        }
        Ok(())
    }
}
