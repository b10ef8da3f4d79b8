//! Scripted transport and clock for exercising the client without a network

use crate::client::{
    Client, Clock, Context, HttpRequest, HttpResponse, MemoryTokenStore, Result, Transport,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    StatusCode,
};
use serde_json::Value;
use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
};

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// Answers requests with a handler and remembers everything it was sent
pub(crate) struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replay `responses` in order, failing once they run out
    pub(crate) fn sequence(responses: Vec<HttpResponse>) -> Self {
        let responses = Mutex::new(VecDeque::from(responses));
        Self::new(move |request| {
            responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| format!("unscripted request to {}", request.url).into())
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.calls())
            .finish()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self::at(1_600_000_000)
    }

    pub(crate) fn at(epoch_seconds: i64) -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_opt(epoch_seconds, 0).unwrap()),
        }
    }

    pub(crate) fn advance(&self, seconds: i64) {
        *self.now.lock().unwrap() += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub(crate) fn json_response(status: StatusCode, body: Value) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    HttpResponse {
        status,
        headers,
        body: body.to_string(),
    }
}

pub(crate) fn empty_response(status: StatusCode) -> HttpResponse {
    HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: String::new(),
    }
}

/// Anonymous client with its own context and an in-memory token store
pub(crate) fn test_client(transport: Arc<MockTransport>) -> Client {
    test_client_with_clock(transport, Arc::new(ManualClock::new()))
}

pub(crate) fn test_client_with_clock(
    transport: Arc<MockTransport>,
    clock: Arc<ManualClock>,
) -> Client {
    // RUST_LOG=debug shows the request log of a failing test
    let _ = env_logger::builder().is_test(true).try_init();

    Client::builder()
        .transport(transport)
        .context(Arc::new(Context::with_clock(clock)))
        .token_store(Arc::new(MemoryTokenStore::new()))
        .build()
        .unwrap()
}
