//! HTTP verb wrapper bound to the backend base URL
//!
//! The backend registers its request routes only with a trailing slash, so
//! every JSON and download path built here ends with `/`. Segments are
//! percent-encoded individually; a `/` inside an identifier never splits
//! the path.

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{OtaClientError, Result};

/// Shared HTTP plumbing for the resource clients
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: Url,
    upload_timeout: Duration,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        let base_url = Url::parse(&config.connection.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(OtaClientError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }

        Ok(Self {
            client,
            base_url,
            upload_timeout: config.upload_timeout(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resource URL with a trailing slash
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        self.build_url(segments, true)
    }

    /// Resource URL without the trailing slash
    pub fn url_exact(&self, segments: &[&str]) -> Result<Url> {
        self.build_url(segments, false)
    }

    fn build_url(&self, segments: &[&str], trailing_slash: bool) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                OtaClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?;
            path.pop_if_empty().extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments)?;
        self.send_json(self.client.get(url)).await
    }

    pub async fn get_with_query<T, Q>(&self, segments: &[&str], query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(segments)?;
        self.send_json(self.client.get(url).query(query)).await
    }

    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.with_body(Method::POST, segments, body).await
    }

    pub async fn put<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.with_body(Method::PUT, segments, body).await
    }

    pub async fn patch<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.with_body(Method::PATCH, segments, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments)?;
        self.send_json(self.client.delete(url)).await
    }

    /// Fetch a binary body
    pub async fn download<Q>(&self, segments: &[&str], query: Option<&Q>) -> Result<Bytes>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url(segments)?;
        let mut request = self.client.get(url);
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            response.bytes().await.map_err(OtaClientError::from_reqwest)
        } else {
            Err(extract_error_from_status(response, status).await)
        }
    }

    /// POST a multipart form to an exact path, with the upload timeout
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: Form,
    ) -> Result<T> {
        let url = self.url_exact(segments)?;
        let request = self
            .client
            .post(url)
            .timeout(self.upload_timeout)
            .multipart(form);
        self.send_json(request).await
    }

    async fn with_body<B, T>(&self, method: Method, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        self.send_json(self.client.request(method, url).json(body))
            .await
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(OtaClientError::from_reqwest)?;
        debug!(
            url = %response.url(),
            status = response.status().as_u16(),
            "Backend responded"
        );
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        handle_response(response).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        response
            .json()
            .await
            .map_err(|e| OtaClientError::Parse(e.to_string()))
    } else {
        Err(extract_error_from_status(response, status).await)
    }
}

/// Build an error from a failed response
///
/// The backend answers with `{"error": ...}` or `{"message": ...}`; anything
/// else falls back to the status line.
async fn extract_error_from_status(
    response: reqwest::Response,
    status: StatusCode,
) -> OtaClientError {
    let body = response.json::<serde_json::Value>().await.ok();
    let message = body
        .as_ref()
        .and_then(|b| b.get("error").or_else(|| b.get("message")))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string()
        });

    match status {
        StatusCode::NOT_FOUND => OtaClientError::NotFound(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => OtaClientError::Timeout,
        _ => OtaClientError::server_error(status.as_u16(), message),
    }
}
