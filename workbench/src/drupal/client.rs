//! reqwest-backed [`DrupalApi`] implementation.
//!
//! Every request is authenticated with HTTP basic credentials from the
//! configuration.

use reqwest::Url;
use std::collections::HashMap;
use tracing::debug;

use super::{ApiRequest, ApiResponse, DrupalApi, RequestBody};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Drupal REST client
#[derive(Clone)]
pub struct DrupalClient {
    http: reqwest::Client,
    base: Url,
    username: String,
    password: String,
}

impl DrupalClient {
    /// Create a client for `config.host`.
    pub fn new(config: &Config) -> ApiResult<Self> {
        let base =
            Url::parse(&config.host).map_err(|_| ApiError::InvalidUrl(config.host.clone()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.host.clone()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("islandora-workbench/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            username: config.username.clone(),
            password: config.password().to_string(),
        })
    }

    /// Absolute URL of a request, path segments percent-encoded.
    pub fn url_for(&self, request: &ApiRequest) -> ApiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(&request.path);
        if request.json_format || !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            if request.json_format {
                pairs.append_pair("_format", "json");
            }
            for (name, value) in &request.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

impl DrupalApi for DrupalClient {
    async fn issue_request(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.url_for(&request)?;
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .basic_auth(&self.username, Some(&self.password));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Bytes(bytes) => builder.body(bytes),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        debug!(status, bytes = body.len(), "response received");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
