use super::{SaveOperation, ServerAck};
use crate::error::SaveError;
use crate::runtime::http_client::build_client;
use reqwest::{Client, Method};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

/// Longest server message carried into a `SaveError`.
const MAX_ERROR_BODY: usize = 512;

/// Saves state by sending it as JSON to a fixed endpoint.
///
/// 2xx bodies are read as a [`ServerAck`] (an empty or unrecognised body is
/// an empty ack). Failures are classified with [`SaveError::from_status`];
/// transport failures are always transient.
pub struct HttpSaver {
    client: Client,
    url: String,
    method: Method,
    bearer_token: Option<String>,
}

impl HttpSaver {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(build_client(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            method: Method::PUT,
            bearer_token: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send<S: Serialize + Sync>(&self, state: &S) -> Result<ServerAck, SaveError> {
        let mut request = self.client.request(self.method.clone(), &self.url).json(state);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SaveError::Transient(format!("request timed out: {e}"))
            } else {
                SaveError::Transient(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(ServerAck::default());
            }
            return Ok(serde_json::from_str(&body).unwrap_or_default());
        }

        Err(SaveError::from_status(status.as_u16(), truncate(&body)))
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

impl<S> SaveOperation<S> for HttpSaver
where
    S: Serialize + Send + Sync,
{
    fn save<'a>(
        &'a self,
        state: &'a S,
    ) -> Pin<Box<dyn Future<Output = Result<ServerAck, SaveError>> + Send + 'a>> {
        Box::pin(self.send(state))
    }
}
