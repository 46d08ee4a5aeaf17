// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! REST client with dry-run support, and mockable responses for tests.
//!
//! Calls are blocking, do not issue them from within an async runtime.
//!
//! ```
//! use runez::Policy;
//! use runez::http::{MockResponse, RestClient};
//! use serde_json::json;
//!
//! let client = RestClient::new("https://example.com/api")
//!     .unwrap()
//!     .with_mock_specs([("v1/ping", MockResponse::json(200, &json!({"pong": true})))]);
//! let data = client.get("v1/ping", &Policy::quiet()).unwrap();
//! assert_eq!(data, Some(json!({"pong": true})));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use reqwest::{Method, Url};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::{
    Error, Hash, Policy, Result, SYS_INFO, TransferOptions, abort, basename, checksum, hdry,
    hlog, short,
};

#[cfg(test)]
#[path = "./http_test.rs"]
mod http_test;

/// Default timeout of [`RestClient`] calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static RX_CHECKSUM_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#(sha224|sha256|sha384|sha512)=([a-f0-9]+)$").expect("valid regex"));

/// Join `base` and `url`, where `base` is the base url of a REST end point.
///
/// `base` is considered to be a folder even without a trailing `/`, so
/// `urljoin("https://example.com/api", "v1")` is `https://example.com/api/v1`.
pub fn urljoin(base: &str, url: &str) -> String {
    if base.is_empty() {
        return url.to_string();
    }
    if url.is_empty() {
        return base.to_string();
    }
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    match Url::parse(&base).and_then(|b| b.join(url)) {
        Ok(joined) => joined.to_string(),
        Err(_) if url.starts_with('/') || Url::parse(url).is_ok() => url.to_string(),
        Err(_) => format!("{base}{url}"),
    }
}

/// Most meaningful message from a typical REST error payload.
///
/// Looks at `message`, `error` and `errors`, recursively.
pub fn extract_message(data: &Value) -> Option<String> {
    match data {
        Value::String(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Value::Object(map) => ["message", "error", "errors"]
            .iter()
            .find_map(|key| map.get(*key).and_then(extract_message)),
        Value::Array(items) => items.iter().find_map(extract_message),
        _ => None,
    }
}

/// A request, as seen by a mock handler.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: String,
    /// Absolute url
    pub url: String,
    pub body: Option<Value>,
}

/// Canned response returned by a mock handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status_code: u16,
    pub content: Vec<u8>,
}

impl MockResponse {
    pub fn new(status_code: u16, content: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            content: content.into(),
        }
    }

    pub fn json(status_code: u16, value: &Value) -> Self {
        Self::new(status_code, value.to_string())
    }

    /// Response with given status, and a `status <code>` body.
    pub fn status(status_code: u16) -> Self {
        Self::new(status_code, format!("status {status_code}"))
    }
}

type MockHandler = Arc<dyn Fn(&RestRequest) -> Option<MockResponse> + Send + Sync>;

/// Response to a [`RestClient`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub method: String,
    pub url: String,
    /// 0 when no response was received
    pub status_code: u16,
    pub content: Vec<u8>,
}

impl RestResponse {
    /// True for any status below 400.
    pub fn ok(&self) -> bool {
        self.status_code > 0 && self.status_code < 400
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.content)?)
    }

    /// `METHOD url [status]`, followed by the error reason for failed calls,
    /// cut to `size` chars.
    pub fn description(&self, size: usize) -> String {
        let mut message = format!("{} {} [{}]", self.method, self.url, self.status_code);
        if !self.ok() && self.status_code != 404 {
            message.push(' ');
            message.push_str(&self.error_reason());
        }
        if message.chars().count() > size {
            message = format!("{}...", message.chars().take(size).collect::<String>());
        }
        message
    }

    /// Message extracted from a json error payload, or the raw body text.
    pub fn error_reason(&self) -> String {
        self.json()
            .ok()
            .and_then(|data| extract_message(&data))
            .unwrap_or_else(|| self.text())
    }
}

impl Display for RestResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Response [{}]>", self.status_code)
    }
}

/// Client for a REST end point at `base_url`.
///
/// Urls given to calls are relative to `base_url`, unless absolute.
/// Mutating calls (post, put, delete, purge, download) respect dry-run mode.
/// Failed calls (no response, or status >= 400) are reported per the
/// call's [`Policy`].
#[derive(Clone)]
pub struct RestClient {
    pub base_url: String,
    /// Headers sent with every call
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
    pub user_agent: String,
    client: Client,
    mock: Option<MockHandler>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("mocked", &self.mock.is_some())
            .finish()
    }
}

impl Display for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!(
                "{} (runez/{})",
                SYS_INFO.program_name,
                env!("CARGO_PKG_VERSION")
            ),
            client: Client::builder().build()?,
            mock: None,
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Answer calls with `handler` instead of going over the network.
    ///
    /// Calls the handler has no response for get a 404.
    pub fn with_mock<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RestRequest) -> Option<MockResponse> + Send + Sync + 'static,
    {
        self.mock = Some(Arc::new(handler));
        self
    }

    /// Answer calls with canned responses, per url (relative to `base_url`).
    pub fn with_mock_specs<I, K>(self, specs: I) -> Self
    where
        I: IntoIterator<Item = (K, MockResponse)>,
        K: AsRef<str>,
    {
        let specs: HashMap<String, MockResponse> = specs
            .into_iter()
            .map(|(url, response)| (self.full_url(url.as_ref()), response))
            .collect();
        self.with_mock(move |request| specs.get(&request.url).cloned())
    }

    /// Same client, with `relative_url` appended to the base url.
    pub fn sub_client(&self, relative_url: &str) -> Self {
        Self {
            base_url: self.full_url(relative_url),
            ..self.clone()
        }
    }

    /// Absolute url for `url`.
    pub fn full_url(&self, url: &str) -> String {
        urljoin(&self.base_url, url)
    }

    pub fn get_response(&self, url: &str, policy: &Policy) -> Result<RestResponse> {
        self.send("GET", url, None, policy, None)
    }

    /// Deserialized json from `url`, `None` if the call failed.
    pub fn get(&self, url: &str, policy: &Policy) -> Result<Option<Value>> {
        let response = self.get_response(url, policy)?;
        if !response.ok() {
            return Ok(None);
        }
        match response.json() {
            Ok(data) => Ok(Some(data)),
            Err(err) => abort(format!("Can't decode {}: {err}", response.url), policy, None),
        }
    }

    pub fn head(&self, url: &str, policy: &Policy) -> Result<RestResponse> {
        self.send("HEAD", url, None, policy, None)
    }

    /// True if `url` responds to a HEAD call with a success status.
    pub fn url_exists(&self, url: &str) -> bool {
        self.head(url, &Policy::quiet()).is_ok_and(|r| r.ok())
    }

    pub fn post(&self, url: &str, body: Option<&Value>, policy: &Policy) -> Result<RestResponse> {
        self.send("POST", url, body, policy, Some("POST"))
    }

    pub fn put(&self, url: &str, body: Option<&Value>, policy: &Policy) -> Result<RestResponse> {
        self.send("PUT", url, body, policy, Some("PUT"))
    }

    pub fn delete(&self, url: &str, policy: &Policy) -> Result<RestResponse> {
        self.send("DELETE", url, None, policy, Some("DELETE"))
    }

    pub fn purge(&self, url: &str, policy: &Policy) -> Result<RestResponse> {
        self.send("PURGE", url, None, policy, Some("PURGE"))
    }

    /// Save contents of `url` to file `destination`.
    ///
    /// A `#sha256=<hex>` suffix (or sha224, sha384, sha512) on `url` gets the
    /// download verified against that checksum, and deleted on mismatch.
    pub fn download<P: AsRef<Path>>(
        &self,
        url: &str,
        destination: P,
        policy: &Policy,
    ) -> Result<RestResponse> {
        let (hash, expected, url) = decomposed_checksum_url(url);
        let response = self.send("GET", url, None, policy, Some("download"))?;
        if !response.ok() || policy.is_dryrun() {
            return Ok(response);
        }

        let destination = destination.as_ref();
        let written = destination
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::write(destination, &response.content));
        if let Err(error) = written {
            return Err(Error::WriteFailed {
                path: destination.to_path_buf(),
                error,
            });
        }

        if let (Some(hash), Some(expected)) = (hash, expected) {
            let actual = checksum(destination, hash)?;
            if actual != expected {
                let _ = std::fs::remove_file(destination);
                let message = format!(
                    "{hash:?} differs for {}: expecting {expected}, got {actual}",
                    short(destination.display())
                );
                return abort(message, policy, response);
            }
        }
        Ok(response)
    }

    /// Download archive at `url`, and decompress it into `destination`.
    pub fn decompress<P: AsRef<Path>>(
        &self,
        url: &str,
        destination: P,
        simplify: bool,
        options: &TransferOptions,
    ) -> Result<RestResponse> {
        let (_, _, actual_url) = decomposed_checksum_url(url);
        let tmp = TempDir::new()?;
        let archive = tmp.path().join(basename(actual_url, false, false));
        let response = self.download(url, &archive, &options.policy)?;
        if response.ok() && !options.policy.is_dryrun() {
            crate::decompress(&archive, destination, simplify, options)?;
        }
        Ok(response)
    }

    fn send(
        &self,
        method: &str,
        url: &str,
        body: Option<&Value>,
        policy: &Policy,
        dryrun_action: Option<&str>,
    ) -> Result<RestResponse> {
        let url = self.full_url(url);
        if let Some(action) = dryrun_action {
            let message = format!("{action} {url}");
            if hdry(policy, &message) {
                let content = json!({"message": format!("dryrun {message}")});
                return Ok(RestResponse {
                    method: method.to_string(),
                    url,
                    status_code: 200,
                    content: content.to_string().into_bytes(),
                });
            }
        }

        let request = RestRequest {
            method: method.to_string(),
            url,
            body: body.cloned(),
        };
        let received = match &self.mock {
            Some(handler) => {
                let mocked = handler(&request).unwrap_or_else(|| {
                    MockResponse::json(404, &json!({"message": "Default status code 404"}))
                });
                Ok((mocked.status_code, mocked.content))
            }
            None => self.perform(&request),
        };
        let response = match received {
            Ok((status_code, content)) => RestResponse {
                method: request.method,
                url: request.url,
                status_code,
                content,
            },
            Err(err) => {
                let message = format!("{method} {} failed: {err}", request.url);
                let response = RestResponse {
                    method: request.method,
                    url: request.url,
                    status_code: 0,
                    content: err.to_string().into_bytes(),
                };
                return abort(message, policy, response);
            }
        };

        let description = response.description(1024);
        if !response.ok() {
            return abort(description, policy, response);
        }
        hlog(policy.logger, description);
        Ok(response)
    }

    /// Status code and body received for `request`.
    fn perform(&self, request: &RestRequest) -> Result<(u16, Vec<u8>)> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            Error::ValidationFailed(format!("Invalid http method '{}'", request.method))
        })?;
        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(self.timeout)
            .header(USER_AGENT, &self.user_agent);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send()?;
        let status_code = response.status().as_u16();
        Ok((status_code, response.bytes()?.to_vec()))
    }
}

/// Checksum algorithm and expected digest from a `#sha256=...` url suffix,
/// along with the url without that suffix.
fn decomposed_checksum_url(url: &str) -> (Option<Hash>, Option<String>, &str) {
    let Some(captures) = RX_CHECKSUM_URL.captures(url) else {
        return (None, None, url);
    };
    let hash = match &captures[1] {
        "sha224" => Hash::Sha224,
        "sha384" => Hash::Sha384,
        "sha512" => Hash::Sha512,
        _ => Hash::Sha256,
    };
    let start = captures.get(0).map_or(url.len(), |m| m.start());
    (Some(hash), Some(captures[2].to_string()), &url[..start])
}
