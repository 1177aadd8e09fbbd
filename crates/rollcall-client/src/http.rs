//! HTTP client for a remote session issuer.
//!
//! Routes (relative to the base URL):
//!
//! | Operation | Route |
//! |---|---|
//! | generate | `POST /sessions/generate` |
//! | active | `GET /sessions/active/{class_id}` |
//! | mark | `POST /attendance/mark` |
//! | history | `GET /attendance/history?classId={class_id}` |

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use rollcall_protocol::{
    ApiError, AttendanceRecord, ClassId, Codec, Credential, GenerateSession, MarkReceipt,
    MarkRequest, Session, SessionId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{AttendanceApi, ClientError};

/// An [`AttendanceApi`] that talks to the issuer over HTTP.
///
/// Generic over the [`Codec`] so the wire format is a type parameter, not a
/// hard-coded `serde_json` call.
#[derive(Debug, Clone)]
pub struct HttpApi<C: Codec> {
    http: reqwest::Client,
    base_url: String,
    codec: C,
}

impl<C: Codec> HttpApi<C> {
    /// Per-request limit used by [`HttpApi::new`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a client for `base_url` (e.g. `https://host/api`). A trailing
    /// slash is ignored. Requests give up after [`Self::DEFAULT_TIMEOUT`].
    pub fn new(base_url: impl Into<String>, codec: C) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "http client setup failed, using defaults");
                reqwest::Client::new()
            });
        Self::with_client(http, base_url, codec)
    }

    /// Like [`HttpApi::new`] with a different per-request timeout.
    ///
    /// # Errors
    /// [`ClientError::Http`] if the TLS backend cannot be initialised.
    pub fn with_timeout(
        base_url: impl Into<String>,
        codec: C,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, codec))
    }

    /// Like [`HttpApi::new`] but reuses an existing `reqwest::Client`
    /// (connection pool, timeouts, proxies).
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>, codec: C) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http,
            base_url,
            codec,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder, credential: &Credential) -> RequestBuilder {
        builder
            .header(AUTHORIZATION, credential.bearer())
            .header(ACCEPT, self.codec.content_type())
    }

    fn with_body<T: Serialize>(
        &self,
        builder: RequestBuilder,
        body: &T,
    ) -> Result<RequestBuilder, ClientError> {
        let bytes = self.codec.encode(body)?;
        Ok(builder
            .header(CONTENT_TYPE, self.codec.content_type())
            .body(bytes))
    }

    /// Sends a request and decodes a success body, or turns a failure
    /// status into [`ClientError::Rejected`] / [`ClientError::Transport`].
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return Ok(self.codec.decode(&bytes)?);
        }

        match self.codec.decode::<ApiError>(&bytes) {
            Ok(api) => {
                tracing::debug!(%status, kind = %api.kind, "issuer rejected request");
                Err(ClientError::Rejected(api))
            }
            Err(_) => Err(ClientError::Transport(format!("unexpected status {status}"))),
        }
    }
}

impl<C: Codec> AttendanceApi for HttpApi<C> {
    async fn generate_session(
        &self,
        credential: &Credential,
        request: &GenerateSession,
    ) -> Result<Session, ClientError> {
        let builder = self.authorized(self.http.post(self.url("/sessions/generate")), credential);
        let builder = self.with_body(builder, request)?;
        self.send(builder).await
    }

    async fn active_session(
        &self,
        credential: &Credential,
        class_id: ClassId,
    ) -> Result<Option<Session>, ClientError> {
        let url = self.url(&format!("/sessions/active/{}", class_id.0));
        let response = self
            .authorized(self.http.get(url), credential)
            .send()
            .await?;

        // 404 is how the issuer says "no live lecture", not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            tracing::trace!(%class_id, "no active session");
            return Ok(None);
        }

        let status = response.status();
        let bytes = response.bytes().await?;
        if status.is_success() {
            // `null` decodes to `None`.
            return Ok(self.codec.decode(&bytes)?);
        }
        match self.codec.decode::<ApiError>(&bytes) {
            Ok(api) => Err(ClientError::Rejected(api)),
            Err(_) => Err(ClientError::Transport(format!("unexpected status {status}"))),
        }
    }

    async fn mark_attendance(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<MarkReceipt, ClientError> {
        let request = MarkRequest {
            session_id: session_id.clone(),
        };
        let builder = self.authorized(self.http.post(self.url("/attendance/mark")), credential);
        let builder = self.with_body(builder, &request)?;
        self.send(builder).await
    }

    async fn attendance_history(
        &self,
        credential: &Credential,
        class_id: ClassId,
    ) -> Result<Vec<AttendanceRecord>, ClientError> {
        let builder = self
            .authorized(self.http.get(self.url("/attendance/history")), credential)
            .query(&[("classId", class_id.0)]);
        self.send(builder).await
    }
}
