//! Posts reply activities to the Bot Framework connector.

use reqwest::StatusCode;
use tracing::debug;

use crate::models::ReplyActivity;
use crate::Result;

/// Sends replies to the conversation that produced a message.
pub struct ReplyClient {
    http: reqwest::Client,
}

impl ReplyClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// POST the reply to the connector's activities endpoint.
    ///
    /// An empty reply text suppresses the call and returns `None`. The HTTP
    /// status is returned as data, non-2xx included; the caller decides what
    /// a rejected send means.
    pub async fn send(
        &self,
        service_url: &str,
        token: &str,
        reply: &ReplyActivity,
    ) -> Result<Option<StatusCode>> {
        if reply.text.is_empty() {
            debug!("empty reply text, nothing to send");
            return Ok(None);
        }

        let url = format!(
            "{}/v3/conversations/{}/activities/{}",
            service_url, reply.conversation.id, reply.reply_to_id
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(reply)
            .send()
            .await?;

        Ok(Some(response.status()))
    }
}
