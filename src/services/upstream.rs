//! Error type shared by the outbound provider clients.

use reqwest::StatusCode;
use thiserror::Error;

use crate::error::ServiceError;

/// Convenient result alias returning [`UpstreamError`] failures.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Failures that can occur while calling an external provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The provider's API key is not set.
    #[error("missing API key for {provider}")]
    MissingKey { provider: &'static str },
    /// The request could not be sent or timed out.
    #[error("failed to send request to {provider}")]
    RequestSend {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with a non-success status.
    #[error("unexpected response status {status} from {provider}")]
    RequestStatus {
        provider: &'static str,
        status: StatusCode,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response from {provider}")]
    DecodeResponse {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The response decoded but did not contain what we asked for.
    #[error("malformed response from {provider}: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },
}

impl UpstreamError {
    fn provider(&self) -> &'static str {
        match self {
            UpstreamError::MissingKey { provider }
            | UpstreamError::RequestSend { provider, .. }
            | UpstreamError::RequestStatus { provider, .. }
            | UpstreamError::DecodeResponse { provider, .. }
            | UpstreamError::Malformed { provider, .. } => provider,
        }
    }
}

impl From<UpstreamError> for ServiceError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::MissingKey { provider } => ServiceError::NotConfigured(provider),
            other => ServiceError::Upstream {
                provider: other.provider(),
                message: other.to_string(),
            },
        }
    }
}

/// Send a prepared request and decode a JSON body, mapping every failure to [`UpstreamError`].
pub async fn send_json<T>(provider: &'static str, request: reqwest::RequestBuilder) -> UpstreamResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(|source| UpstreamError::RequestSend { provider, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::RequestStatus { provider, status });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| UpstreamError::DecodeResponse { provider, source })
}
