//! Mock origin serving byte ranges of an in-memory body.
//!
//! `RangeResponder` answers `Range: bytes=a-b` with `206` and the exact
//! slice, answers unranged requests with `200` and the whole body, and can be
//! told to fail the first N requests for a given chunk start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// How an injected failure looks on the wire.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Respond with this status and no body.
    Status(u16),
    /// Respond `206` with only the first half of the requested span.
    Truncate,
}

/// Deterministic test payload of `len` bytes.
#[must_use]
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[derive(Debug)]
pub struct RangeResponder {
    body: Arc<Vec<u8>>,
    failures: Mutex<HashMap<u64, u32>>,
    failure: Failure,
    delay: Option<Duration>,
}

impl RangeResponder {
    #[must_use]
    pub fn new(body: Arc<Vec<u8>>) -> Self {
        Self {
            body,
            failures: Mutex::new(HashMap::new()),
            failure: Failure::Status(500),
            delay: None,
        }
    }

    /// Fails the first `times` requests whose range starts at `start`.
    #[must_use]
    pub fn fail_chunk(self, start: u64, times: u32) -> Self {
        self.failures.lock().unwrap().insert(start, times);
        self
    }

    #[must_use]
    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failure = failure;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn template(&self, status: u16) -> ResponseTemplate {
        let template = ResponseTemplate::new(status);
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

fn parse_range(request: &Request) -> Option<(u64, u64)> {
    let value = request.headers.get("range")?.to_str().ok()?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let total = self.body.len() as u64;
        let Some((start, end)) = parse_range(request) else {
            return self.template(200).set_body_bytes(self.body.as_slice().to_vec());
        };
        let end = end.min(total - 1);
        let slice = &self.body[start as usize..=end as usize];

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&start)
                && *remaining > 0
            {
                *remaining -= 1;
                return match self.failure {
                    Failure::Status(status) => self.template(status),
                    Failure::Truncate => self
                        .template(206)
                        .set_body_bytes(slice[..slice.len() / 2].to_vec()),
                };
            }
        }

        self.template(206)
            .insert_header("Content-Range", format!("bytes {start}-{end}/{total}").as_str())
            .set_body_bytes(slice.to_vec())
    }
}

/// Mounts a `HEAD` answer advertising `len` bytes, with or without
/// `Accept-Ranges: bytes`.
pub async fn mount_head(server: &MockServer, route: &str, len: usize, ranges: bool) {
    let mut template = ResponseTemplate::new(200)
        .insert_header("Content-Length", len.to_string().as_str())
        .set_body_bytes(vec![0u8; len]);
    if ranges {
        template = template.insert_header("Accept-Ranges", "bytes");
    }
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Mounts a range-capable resource at `route` serving `body`.
pub async fn mount_ranged(server: &MockServer, route: &str, body: Arc<Vec<u8>>) {
    mount_head(server, route, body.len(), true).await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(RangeResponder::new(body))
        .mount(server)
        .await;
}

/// Number of `GET` requests the server has seen.
pub async fn get_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == "GET")
        .count()
}
