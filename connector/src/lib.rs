/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod auth;
pub mod builds;
pub mod execution;
pub mod logs;
pub mod projects;
pub mod types;

pub use types::*;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

pub const UNKNOWN_ERROR: &str = "An unknown error occurred";
pub const NO_DETAIL: &str = "No further details available.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub project_url: String,
    pub execution_url: String,
    pub auth_url: String,
    pub token: Option<String>,
}

/// The backend is split into three services, each with its own base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceBase {
    Project,
    Execution,
    Auth,
}

impl RequestConfig {
    pub fn base_url(&self, base: ServiceBase) -> &str {
        let url = match base {
            ServiceBase::Project => &self.project_url,
            ServiceBase::Execution => &self.execution_url,
            ServiceBase::Auth => &self.auth_url,
        };

        url.trim_end_matches('/')
    }

    pub fn url(&self, base: ServiceBase, endpoint: &str) -> String {
        format!("{}{}", self.base_url(base), endpoint)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Ok { data: T, message: String },
    Err { message: String, detail: String },
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResponse::Ok { .. })
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ApiResponse::Ok { data, .. } => Some(data),
            ApiResponse::Err { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiResponse::Ok { message, .. } | ApiResponse::Err { message, .. } => message,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            ApiResponse::Ok { data, message } => ApiResponse::Ok {
                data: f(data),
                message,
            },
            ApiResponse::Err { message, detail } => ApiResponse::Err { message, detail },
        }
    }

    pub fn into_result(self) -> Result<T, ConnectorError> {
        match self {
            ApiResponse::Ok { data, .. } => Ok(data),
            ApiResponse::Err { message, detail } => Err(ConnectorError::Api { message, detail }),
        }
    }

    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        ApiResponse::Err {
            message: UNKNOWN_ERROR.to_string(),
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("{message} ({detail})")]
    Api { message: String, detail: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ConnectorError {
    pub fn detail(&self) -> String {
        match self {
            ConnectorError::Api { detail, .. } => detail.clone(),
            ConnectorError::Transport(e) => e.to_string(),
        }
    }
}

pub type RequestType = reqwest::Method;

#[derive(Deserialize)]
struct SuccessBody {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

pub(crate) async fn parse_response<T: DeserializeOwned>(res: reqwest::Response) -> ApiResponse<T> {
    let status = res.status();
    let bytes = match res.bytes().await {
        Ok(b) => b,
        Err(e) => return ApiResponse::transport(e),
    };

    if !status.is_success() {
        debug!(%status, "request rejected");
        let body = serde_json::from_slice::<ErrorBody>(&bytes).ok();
        let message = body.as_ref().and_then(|b| b.message.clone());
        let detail = body.and_then(|b| b.detail);

        return ApiResponse::Err {
            message: message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            detail: detail.unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16())),
        };
    }

    let body = match serde_json::from_slice::<SuccessBody>(&bytes) {
        Ok(body) => body,
        Err(e) => {
            return ApiResponse::Err {
                message: "Invalid response".to_string(),
                detail: e.to_string(),
            };
        }
    };

    if body.success == Some(false) {
        let message = body.message.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        return ApiResponse::Err {
            detail: body.detail.unwrap_or_else(|| message.clone()),
            message,
        };
    }

    match serde_json::from_value::<T>(body.data) {
        Ok(data) => ApiResponse::Ok {
            data,
            message: body
                .message
                .unwrap_or_else(|| "Request was successful".to_string()),
        },
        Err(e) => ApiResponse::Err {
            message: "Invalid response".to_string(),
            detail: e.to_string(),
        },
    }
}

pub fn get_client(
    config: &RequestConfig,
    base: ServiceBase,
    endpoint: &str,
    request_type: RequestType,
) -> reqwest::RequestBuilder {
    let url = config.url(base, endpoint);
    debug!(method = %request_type, %url, "sending request");

    let mut client = reqwest::Client::new()
        .request(request_type, url)
        .header("Content-Type", "application/json");

    if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
        client = client.header("Authorization", format!("Bearer {}", token));
    }

    client
}

/// Sends a request once and folds every failure into [`ApiResponse::Err`].
pub async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> ApiResponse<T> {
    match request.send().await {
        Ok(res) => parse_response(res).await,
        Err(e) => {
            debug!(error = %e, "request failed");
            ApiResponse::transport(e)
        }
    }
}
