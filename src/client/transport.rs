use crate::client::Result;
use log::debug;
use reqwest::{blocking::Client as ReqwestClient, header::HeaderMap, Method, StatusCode};
use std::{fmt, time::Duration};
use url::Url;

/// A fully prepared request, headers included.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Executes exactly one HTTP exchange. Implementations block until a
/// response arrives or the connection fails; they never retry.
pub trait Transport: fmt::Debug + Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// `Transport` backed by reqwest's blocking client
#[derive(Debug)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ReqwestClient::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        debug!("Github Response: {:#?}", response);

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
