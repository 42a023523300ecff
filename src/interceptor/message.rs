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

//! Request and response shapes that flow through the interceptor.
//!
//! Header names keep the case the caller used so guard expressions such as
//! `header.reqHeader1` see them as written.

use bytes::Bytes;
use http::{Method, StatusCode, Version};
use mime::Mime;
use std::borrow::Cow;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub bytes: Bytes,
    pub content_type: Option<Mime>,
}

impl Body {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<Mime>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    body: Option<Body>,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, bytes: impl Into<Bytes>, content_type: Option<Mime>) -> Self {
        self.body = Some(Body::new(bytes, content_type));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Headers in the order they were added.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Last value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// The string stored patterns are matched against: the percent-decoded
    /// path, prefixed by `scheme://host[:port]` when `pattern` is an absolute
    /// URL. Query and fragment never take part.
    pub fn comparable_url(&self, pattern: &str) -> String {
        let raw_path = self.url.path();
        let path = urlencoding::decode(raw_path).unwrap_or(Cow::Borrowed(raw_path));
        if !pattern.contains("://") {
            return path.into_owned();
        }

        let mut url = format!("{}://{}", self.url.scheme(), self.url.host_str().unwrap_or(""));
        if let Some(port) = self.url.port() {
            url.push(':');
            url.push_str(&port.to_string());
        }
        url.push_str(&path);
        url
    }
}

/// What the caller gets back, whether mocked or fetched.
#[derive(Debug, Clone)]
pub struct InterceptedResponse {
    pub status: StatusCode,
    pub message: Option<String>,
    pub version: Version,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl InterceptedResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
            version: Version::HTTP_11,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Reason phrase: the stored message, else the canonical one.
    pub fn reason(&self) -> &str {
        self.message
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("")
    }

    /// Converts into an `http::Response`, adding `Content-Type` from the
    /// body when no header sets it.
    pub fn into_http(self) -> anyhow::Result<http::Response<Bytes>> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .version(self.version);

        let has_content_type = self
            .headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(http::header::CONTENT_TYPE.as_str()));
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let (bytes, content_type) = match self.body {
            Some(body) => (body.bytes, body.content_type),
            None => (Bytes::new(), None),
        };
        if let (false, Some(content_type)) = (has_content_type, content_type) {
            builder = builder.header(http::header::CONTENT_TYPE, content_type.as_ref());
        }

        Ok(builder.body(bytes)?)
    }
}
