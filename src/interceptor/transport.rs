/*
 * Copyright 2026 ReMock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::interceptor::message::{Body, InterceptedRequest, InterceptedResponse};
use anyhow::Context;
use async_trait::async_trait;
use http::{StatusCode, Version};
use std::time::Duration;
use tracing::debug;

/// The real network call used whenever no mock applies.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn proceed(&self, request: InterceptedRequest) -> anyhow::Result<InterceptedResponse>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn proceed(&self, request: InterceptedRequest) -> anyhow::Result<InterceptedResponse> {
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .with_context(|| format!("Unsupported HTTP method: {}", request.method()))?;
        let mut builder = self.client.request(method, request.url().as_str());

        let mut has_content_type = false;
        for (name, value) in request.headers() {
            has_content_type |= name.eq_ignore_ascii_case("content-type");
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            if let (false, Some(content_type)) = (has_content_type, &body.content_type) {
                builder = builder.header("content-type", content_type.as_ref());
            }
            builder = builder.body(body.bytes.clone());
        }

        debug!(method = %request.method(), url = %request.url(), "Sending request to network");
        let response = builder
            .send()
            .await
            .with_context(|| format!("Request to {} failed", request.url()))?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .context("Upstream returned an invalid status code")?;
        let version = convert_version(response.version());
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<mime::Mime>().ok());
        let bytes = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        Ok(InterceptedResponse {
            status,
            message: None,
            version,
            headers,
            body: Some(Body::new(bytes, content_type)),
        })
    }
}

fn convert_version(version: reqwest::Version) -> Version {
    if version == reqwest::Version::HTTP_09 {
        Version::HTTP_09
    } else if version == reqwest::Version::HTTP_10 {
        Version::HTTP_10
    } else if version == reqwest::Version::HTTP_2 {
        Version::HTTP_2
    } else if version == reqwest::Version::HTTP_3 {
        Version::HTTP_3
    } else {
        Version::HTTP_11
    }
}
