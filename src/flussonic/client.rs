//! HTTP client for the Flussonic API.

use std::time::{Duration, Instant};

use reqwest::Client;

use super::source::{ApiMethod, FetchError, StatSource};
use super::types::{ApiResponse, Media, ServerInfo, Sessions};
use crate::config::Target;

/// Basic-auth HTTP client bound to one target.
pub struct FlussonicClient {
    base_url: String,
    user: String,
    password: String,
    client: Client,
}

impl FlussonicClient {
    /// Build a client for `target`, bounding every request by the target's timeout.
    ///
    /// # Errors
    /// Returns `FetchError::Client` if the HTTP client cannot be built.
    pub fn new(target: &Target) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(target.timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            base_url: target.url.as_str().trim_end_matches('/').to_owned(),
            user: target.user.clone(),
            password: target.password.clone(),
            client,
        })
    }

    /// Full URL of an API method.
    pub fn url_for(&self, method: ApiMethod) -> String {
        format!("{}{}", self.base_url, method.path())
    }

    async fn fetch(&self, method: ApiMethod) -> Result<(Vec<u8>, Duration), FetchError> {
        let url = self.url_for(method);

        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;
        let request_duration = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        tracing::trace!(url = %url, bytes = body.len(), ?request_duration, "API response received");
        Ok((body.to_vec(), request_duration))
    }

    async fn fetch_decoded<T>(
        &self,
        method: ApiMethod,
        decode: impl FnOnce(&[u8]) -> Result<T, serde_json::Error>,
    ) -> Result<ApiResponse<T>, FetchError> {
        let (body, request_duration) = self.fetch(method).await?;
        let data = decode(&body).map_err(|source| FetchError::Decode {
            url: self.url_for(method),
            source,
        })?;
        Ok(ApiResponse {
            url: method.path(),
            request_duration,
            data,
        })
    }
}

impl std::fmt::Debug for FlussonicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlussonicClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl StatSource for FlussonicClient {
    async fn server(&self) -> Result<ApiResponse<ServerInfo>, FetchError> {
        self.fetch_decoded(ApiMethod::Server, |body| serde_json::from_slice(body))
            .await
    }

    async fn media(&self) -> Result<ApiResponse<Media>, FetchError> {
        self.fetch_decoded(ApiMethod::Media, Media::from_json).await
    }

    async fn sessions(&self) -> Result<ApiResponse<Sessions>, FetchError> {
        self.fetch_decoded(ApiMethod::Sessions, Sessions::from_json)
            .await
    }
}
