//! Transport session - authenticated request execution
//!
//! Session bootstrap (login, cookies, tokens) happens elsewhere; this layer
//! only executes requests with whatever authentication material the caller
//! established, and triages failures into the listen error taxonomy.

use async_trait::async_trait;
use courier_common::{ListenError, ListenResult};
use serde_json::Value;
use std::time::Duration;

/// Authenticated HTTP execution, as consumed by the long-poll channel.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Issue a GET and return the raw response body.
    async fn get(&self, url: &str, params: &[(&str, String)], timeout: Duration)
        -> ListenResult<String>;

    /// Issue a POST with form fields and return the parsed JSON body.
    async fn post(&self, url: &str, form: &[(&str, String)], timeout: Duration)
        -> ListenResult<Value>;
}

/// `reqwest`-backed transport session.
///
/// Cookie material is whatever the supplied client carries; this type adds
/// no authentication of its own.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Wrap an already-configured client (cookie store, proxy, user agent)
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a transport with a cookie-storing default client
    pub fn with_defaults() -> ListenResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(ListenError::fatal)?;
        Ok(Self { client })
    }

    fn triage(err: reqwest::Error) -> ListenError {
        if err.is_timeout() {
            ListenError::Timeout
        } else if err.is_connect() {
            ListenError::ConnectionLost(err.to_string())
        } else if let Some(status) = err.status() {
            ListenError::from_status(status.as_u16())
        } else {
            ListenError::ConnectionLost(err.to_string())
        }
    }
}

#[async_trait]
impl TransportSession for HttpTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> ListenResult<String> {
        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::triage)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListenError::from_status(status.as_u16()));
        }

        response.text().await.map_err(Self::triage)
    }

    async fn post(
        &self,
        url: &str,
        form: &[(&str, String)],
        timeout: Duration,
    ) -> ListenResult<Value> {
        let response = self
            .client
            .post(url)
            .form(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::triage)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListenError::from_status(status.as_u16()));
        }

        response.json().await.map_err(Self::triage)
    }
}
