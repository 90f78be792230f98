//! Unsplash photo API client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{CredentialValidator, ImageProvider, ProviderError};

/// Default API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.unsplash.com";

/// Timeout applied to every API request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout applied to image downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Number of downloaded images kept on disk.
const KEEP_DOWNLOADS: usize = 5;

/// Hands out the access key a request should use and takes rejection reports.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Returns the key to use for the next request.
    ///
    /// # Errors
    ///
    /// Fails fast when no key can be used (offline, exhausted).
    fn credential_for_request(&self) -> Result<String, ProviderError>;

    /// Reports that the API rejected `credential`.
    async fn report_rejected(&self, credential: &str);
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
    pub id: String,
    pub urls: PhotoUrls,
    #[serde(default)]
    pub links: PhotoLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoUrls {
    pub full: String,
    #[serde(default)]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoLinks {
    #[serde(default)]
    pub download_location: Option<String>,
}

// ============================================================================
// Classification
// ============================================================================

/// Maps an HTTP status to a classified error. Returns `None` for success.
///
/// Unsplash answers an exhausted hourly quota with `403` and
/// `X-Ratelimit-Remaining: 0`; any other `403` is a rejected key.
#[must_use]
pub fn classify_status(status: StatusCode, ratelimit_remaining: Option<&str>) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }

    let quota_spent = ratelimit_remaining.is_some_and(|remaining| remaining.trim() == "0");

    Some(match status {
        StatusCode::UNAUTHORIZED => ProviderError::Unauthorized,
        StatusCode::FORBIDDEN if quota_spent => ProviderError::RateLimited,
        StatusCode::FORBIDDEN => ProviderError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        other => ProviderError::Other(format!("photo API returned HTTP {other}")),
    })
}

/// Maps a transport error to a classified error.
///
/// Only a failed connection means the machine is offline. A slow response
/// from a reachable API is an ordinary failure.
#[must_use]
pub fn classify_transport(err: &reqwest::Error) -> ProviderError {
    if err.is_connect() {
        ProviderError::NoConnectivity
    } else if err.is_timeout() {
        ProviderError::Other(format!("photo API timed out: {err}"))
    } else if err.is_decode() {
        ProviderError::Other(format!("malformed photo API response: {err}"))
    } else {
        ProviderError::Other(err.to_string())
    }
}

/// Returns the file name a photo is downloaded to.
///
/// # Errors
///
/// Returns an error if the API handed back an id that is not a plain file name.
pub fn download_file_name(id: &str) -> Result<String, ProviderError> {
    let unsafe_id = id.is_empty()
        || id.contains(['/', '\\', '\0'])
        || id.contains("..")
        || id.starts_with('.');
    if unsafe_id {
        return Err(ProviderError::Other(format!("photo API returned an unusable id: {id:?}")));
    }
    Ok(format!("{id}.jpg"))
}

fn check(response: &reqwest::Response) -> Result<(), ProviderError> {
    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok());

    classify_status(response.status(), remaining).map_or(Ok(()), Err)
}

/// Parses a `/photos/random` response body.
///
/// # Errors
///
/// Returns [`ProviderError::Other`] if the body is not a photo object.
pub fn parse_photo(body: &str) -> Result<Photo, ProviderError> {
    serde_json::from_str(body)
        .map_err(|err| ProviderError::Other(format!("malformed photo API response: {err}")))
}

// ============================================================================
// Client
// ============================================================================

/// Search options for random photos.
#[derive(Debug, Clone, Default)]
pub struct PhotoQuery {
    pub query: Option<String>,
    pub orientation: Option<String>,
}

/// Thin client over the Unsplash REST API.
#[derive(Debug, Clone)]
pub struct UnsplashClient {
    http: reqwest::Client,
    api_base: String,
}

impl UnsplashClient {
    /// Creates a client for `api_base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(api_base: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("backdrop/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|err| ProviderError::Other(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, path: &str, credential: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{path}", self.api_base))
            .header("Authorization", format!("Client-ID {credential}"))
            .header("Accept-Version", "v1")
            .timeout(REQUEST_TIMEOUT)
    }

    /// Asks for one random photo.
    ///
    /// # Errors
    ///
    /// Returns a classified error if the request fails.
    pub async fn random_photo(&self, credential: &str, query: &PhotoQuery) -> Result<Photo, ProviderError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(q) = query.query.as_deref() {
            params.push(("query", q));
        }
        if let Some(orientation) = query.orientation.as_deref() {
            params.push(("orientation", orientation));
        }

        let response = self
            .get("/photos/random", credential)
            .query(&params)
            .send()
            .await
            .map_err(|err| classify_transport(&err))?;
        check(&response)?;

        let body = response.text().await.map_err(|err| classify_transport(&err))?;
        parse_photo(&body)
    }

    /// Tells the API a photo was downloaded, as the API guidelines require.
    async fn track_download(&self, credential: &str, location: &str) {
        let result = self
            .http
            .get(location)
            .header("Authorization", format!("Client-ID {credential}"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await;

        if let Err(err) = result {
            tracing::debug!(error = %err, "unsplash: download tracking failed");
        }
    }

    /// Downloads `url` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns a classified error if the download or the write fails.
    pub async fn download(&self, url: &str, dest: &std::path::Path) -> Result<(), ProviderError> {
        let response = self
            .http
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|err| classify_transport(&err))?;
        check(&response)?;

        let bytes = response.bytes().await.map_err(|err| classify_transport(&err))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ProviderError::Other(format!("failed to create {}: {err}", parent.display())))?;
        }
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|err| ProviderError::Other(format!("failed to write {}: {err}", dest.display())))
    }
}

#[async_trait]
impl CredentialValidator for UnsplashClient {
    async fn validate_credential(&self, credential: &str) -> Result<(), ProviderError> {
        let response = self
            .get("/photos", credential)
            .query(&[("per_page", "1")])
            .send()
            .await
            .map_err(|err| classify_transport(&err))?;

        check(&response)
    }
}

// ============================================================================
// Image provider
// ============================================================================

/// Fetches random photos and stores them in a download directory.
pub struct UnsplashImageProvider {
    client: UnsplashClient,
    credentials: Arc<dyn CredentialSource>,
    download_dir: PathBuf,
    query: PhotoQuery,
}

impl UnsplashImageProvider {
    #[must_use]
    pub fn new(
        client: UnsplashClient,
        credentials: Arc<dyn CredentialSource>,
        download_dir: PathBuf,
        query: PhotoQuery,
    ) -> Self {
        Self { client, credentials, download_dir, query }
    }
}

#[async_trait]
impl ImageProvider for UnsplashImageProvider {
    async fn fetch_next_image(&self) -> Result<PathBuf, ProviderError> {
        let credential = self.credentials.credential_for_request()?;

        let photo = match self.client.random_photo(&credential, &self.query).await {
            Ok(photo) => photo,
            Err(err @ (ProviderError::Unauthorized | ProviderError::RateLimited)) => {
                self.credentials.report_rejected(&credential).await;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let dest = self.download_dir.join(download_file_name(&photo.id)?);
        if !dest.exists() {
            tracing::debug!(id = %photo.id, "unsplash: downloading photo");
            self.client.download(&photo.urls.full, &dest).await?;
        }

        if let Some(location) = photo.links.download_location.as_deref() {
            self.client.track_download(&credential, location).await;
        }

        match crate::cache::prune_downloads(&self.download_dir, KEEP_DOWNLOADS) {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "unsplash: pruned old downloads"),
            Err(err) => tracing::warn!(error = %err, "unsplash: failed to prune downloads"),
        }

        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status_success() {
        assert_eq!(classify_status(StatusCode::OK, None), None);
    }

    #[test]
    fn test_classify_status_unauthorized() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, Some("49")),
            Some(ProviderError::Unauthorized)
        );
    }

    #[test]
    fn test_classify_status_forbidden_with_spent_quota_is_rate_limited() {
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, Some("0")),
            Some(ProviderError::RateLimited)
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, Some("12")),
            Some(ProviderError::Unauthorized)
        );
        assert_eq!(classify_status(StatusCode::FORBIDDEN, None), Some(ProviderError::Unauthorized));
    }

    #[test]
    fn test_classify_status_too_many_requests() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, None),
            Some(ProviderError::RateLimited)
        );
    }

    #[test]
    fn test_classify_status_server_error_is_other() {
        let err = classify_status(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert!(matches!(err, Some(ProviderError::Other(message)) if message.contains("500")));
    }

    #[test]
    fn test_parse_photo() {
        let body = r#"{
            "id": "Dwu85P9SOIk",
            "width": 2448,
            "urls": {
                "raw": "https://images.unsplash.com/photo-1?ixid=abc",
                "full": "https://images.unsplash.com/photo-1?q=85"
            },
            "links": {
                "download_location": "https://api.unsplash.com/photos/Dwu85P9SOIk/download"
            }
        }"#;

        let photo = parse_photo(body).unwrap();

        assert_eq!(photo.id, "Dwu85P9SOIk");
        assert_eq!(photo.urls.full, "https://images.unsplash.com/photo-1?q=85");
        assert_eq!(
            photo.links.download_location.as_deref(),
            Some("https://api.unsplash.com/photos/Dwu85P9SOIk/download")
        );
    }

    #[test]
    fn test_parse_photo_without_links() {
        let photo = parse_photo(r#"{"id": "x", "urls": {"full": "https://a/b"}}"#).unwrap();

        assert!(photo.links.download_location.is_none());
    }

    #[test]
    fn test_parse_photo_rejects_error_body() {
        let err = parse_photo(r#"{"errors": ["OAuth error: The access token is invalid"]}"#);

        assert!(matches!(err, Err(ProviderError::Other(_))));
    }

    #[tokio::test]
    async fn test_validate_credential_unreachable_host_is_no_connectivity() {
        // Nothing listens on port 9 of the loopback interface.
        let client = UnsplashClient::new("http://127.0.0.1:9").unwrap();

        let result = client.validate_credential("key").await;

        assert_eq!(result, Err(ProviderError::NoConnectivity));
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(download_file_name("Dwu85P9SOIk").unwrap(), "Dwu85P9SOIk.jpg");
        assert_eq!(download_file_name("a-b_c").unwrap(), "a-b_c.jpg");
    }

    #[test]
    fn test_download_file_name_rejects_paths() {
        for id in ["", "../etc/passwd", "nested/id", "..", "back\\slash", ".hidden"] {
            assert!(
                matches!(download_file_name(id), Err(ProviderError::Other(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_response_timeout_is_not_no_connectivity() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // Accept and hold the connection without ever answering.
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let err = reqwest::Client::new()
            .get(format!("http://{addr}/photos"))
            .timeout(Duration::from_millis(200))
            .send()
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(classify_transport(&err), ProviderError::Other(_)));
        server.abort();
    }
}
