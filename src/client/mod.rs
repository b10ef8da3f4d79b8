use crate::Config;
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method, StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use url::Url;

mod authorizations;
mod context;
mod credentials;
mod error;
mod issues;
mod labels;
mod pagination;
mod rate_limit;
mod repos;
#[cfg(test)]
mod test_support;
mod transport;
mod users;

pub use authorizations::{is_valid_scope, AuthenticatedClient, DEFAULT_SCOPES, VALID_SCOPES};
pub use context::{Clock, Context, SystemClock};
pub use credentials::{
    parse_scopes, Credentials, FileTokenStore, Identity, MemoryTokenStore, ScopeSet, TokenStore,
    DEFAULT_TOKEN_FILE, TOKEN_FILE_ENV,
};
pub use error::{ApiError, Error, ErrorKind, GithubClientError, GithubClientErrorType, Result};
pub use issues::{IssuesClient, ListIssuesForRepoOptions, MilestoneFilter};
pub use labels::LabelsClient;
pub use pagination::{
    parse_link_header, PageOptions, Pages, Pagination, PaginationOptions, SortDirection,
    SortPages, StateFilter, DEFAULT_PAGE_DELAY, DEFAULT_PAGE_LIMIT,
};
pub use rate_limit::{
    Rate, RateLimitClient, RateLimitSnapshot, AUTHENTICATED_CORE_LIMIT, RATE_LIMIT_TTL_SECS,
};
pub use repos::{ListReposOptions, RepoType, RepositoryClient};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use users::UsersClient;

// Constants
const DEFAULT_BASE_URL: &str = "https://api.github.com/";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const HEADER_LINK: &str = "Link";
const HEADER_RATE_LIMIT: &str = "X-RateLimit-Limit";
const HEADER_RATE_REMAINING: &str = "X-RateLimit-Remaining";
const HEADER_RATE_RESET: &str = "X-RateLimit-Reset";
const HEADER_OTP: &str = "X-GitHub-OTP";
const HEADER_OAUTH_SCOPES: &str = "X-OAuth-Scopes";

const MEDIA_TYPE_V3: &str = "application/vnd.github.v3+json";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode a value for use as a single path segment. Empty and dot
/// segments are refused; `%2E%2E` is still `..` when a url is resolved.
pub(crate) fn segment(value: &str) -> Result<String> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(Error::InvalidPathSegment(value.to_owned()));
    }
    Ok(utf8_percent_encode(value, PATH_SEGMENT).to_string())
}

/// Status Github answers a successful request with, by verb
fn default_status(method: &Method) -> Result<StatusCode> {
    if *method == Method::GET || *method == Method::PUT || *method == Method::PATCH {
        Ok(StatusCode::OK)
    } else if *method == Method::POST {
        Ok(StatusCode::CREATED)
    } else if *method == Method::DELETE {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::UnsupportedVerb(method.clone()))
    }
}

/// Coarse category of a status that fell outside of the expected set
fn classify(status: StatusCode, headers: &HeaderMap) -> ErrorKind {
    let exhausted = headers
        .get(HEADER_RATE_REMAINING)
        .and_then(|h| h.to_str().ok())
        .map(|remaining| remaining.trim() == "0")
        .unwrap_or(false);

    match status.as_u16() {
        404 => ErrorKind::NotFound,
        403 if exhausted => ErrorKind::RateLimited,
        429 => ErrorKind::RateLimited,
        401 | 403 => ErrorKind::Unauthorized,
        400..=499 => ErrorKind::ClientError,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::UnexpectedStatus,
    }
}

/// A single call against the API: verb, target, optional body, the statuses
/// that count as success and the scopes the call needs.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    expected: Vec<StatusCode>,
    scopes: ScopeSet,
}

impl Request {
    /// `url` is either absolute or relative to the client's base url
    pub fn new<S: Into<String>>(method: Method, url: S) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            expected: Vec::new(),
            scopes: ScopeSet::new(),
        }
    }

    pub fn get<S: Into<String>>(url: S) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post<S: Into<String>>(url: S) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put<S: Into<String>>(url: S) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch<S: Into<String>>(url: S) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete<S: Into<String>>(url: S) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<T: Serialize>(self, body: &T) -> Result<Self> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    /// Append the fields of `query` as query parameters. `None` fields are
    /// skipped and lists are joined with commas.
    pub fn query<T: Serialize>(mut self, query: &T) -> Result<Self> {
        let fields = match serde_json::to_value(query)? {
            Value::Object(fields) => fields,
            Value::Null => return Ok(self),
            _ => return Err("query parameters must serialize to a map".into()),
        };

        for (key, value) in fields {
            let value = match value {
                Value::Null => continue,
                Value::Array(ref items) if items.is_empty() => continue,
                Value::Array(items) => items
                    .iter()
                    .map(query_value)
                    .collect::<Vec<_>>()
                    .join(","),
                other => query_value(&other),
            };
            self.query.push((key, value));
        }

        Ok(self)
    }

    /// Replace the default expected status for the verb
    pub fn expect(mut self, statuses: &[StatusCode]) -> Self {
        self.expected = statuses.to_vec();
        self
    }

    /// Scopes the current token must have been granted for this call
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    pub fn required_scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    /// Statuses accepted as success. Fails for verbs the API is never
    /// called with.
    pub fn expected_statuses(&self) -> Result<Vec<StatusCode>> {
        let default = default_status(&self.method)?;
        if self.expected.is_empty() {
            Ok(vec![default])
        } else {
            Ok(self.expected.clone())
        }
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Payload of a successful request along with the paging and rate limit
/// metadata Github sent with it
#[derive(Debug)]
pub struct Response<T> {
    pagination: Pagination,
    rate: Rate,
    oauth_scopes: Option<ScopeSet>,
    inner: T,
}

impl<T> Response<T> {
    pub fn new(pagination: Pagination, rate: Rate, inner: T) -> Self {
        Self {
            pagination,
            rate,
            oauth_scopes: None,
            inner,
        }
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn rate(&self) -> &Rate {
        &self.rate
    }

    /// Scopes granted to the token that made the request, when Github said so
    pub fn oauth_scopes(&self) -> Option<&ScopeSet> {
        self.oauth_scopes.as_ref()
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn into_parts(self) -> (Pagination, Rate, T) {
        (self.pagination, self.rate, self.inner)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Response<U> {
        Response {
            pagination: self.pagination,
            rate: self.rate,
            oauth_scopes: self.oauth_scopes,
            inner: f(self.inner),
        }
    }
}

impl Response<Value> {
    /// Deserialize the payload into `T`
    pub fn json<T: serde::de::DeserializeOwned>(self) -> Result<Response<T>> {
        let Response {
            pagination,
            rate,
            oauth_scopes,
            inner,
        } = self;
        Ok(Response {
            pagination,
            rate,
            oauth_scopes,
            inner: serde_json::from_value(inner)?,
        })
    }
}

#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    github_api_token: Option<String>,
    token_scopes: Option<ScopeSet>,
    token_store: Option<Arc<dyn TokenStore>>,
    transport: Option<Arc<dyn Transport>>,
    context: Option<Arc<Context>>,
    page_options: PageOptions,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            user_agent: None,
            timeout: None,
            github_api_token: None,
            token_scopes: None,
            token_store: None,
            transport: None,
            context: None,
            page_options: PageOptions::default(),
        }
    }

    /// Apply every setting found in `config`
    pub fn config(mut self, config: &Config) -> Self {
        if let Some(base_url) = &config.base_url {
            self.base_url = Some(base_url.clone());
        }
        if let Some(user_agent) = &config.user_agent {
            self.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = config.timeout() {
            self.timeout = Some(timeout);
        }
        if let Some(token_file) = &config.token_file {
            self.token_store = Some(Arc::new(FileTokenStore::new(token_file.clone())));
        }
        self.page_options = config.page_options();
        self
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Transport level timeout for each request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Start out authenticated with an existing token. The token is not
    /// verified and not written to the token store.
    pub fn github_api_token<S: Into<String>>(mut self, github_api_token: S) -> Self {
        self.github_api_token = Some(github_api_token.into());
        self
    }

    /// Scopes known to be granted to the token passed to `github_api_token`
    pub fn token_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.token_scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn token_store(mut self, token_store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(token_store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share the query counter and rate limit cache of `context` instead of
    /// the process-wide one
    pub fn context(mut self, context: Arc<Context>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn page_options(mut self, page_options: PageOptions) -> Self {
        self.page_options = page_options;
        self
    }

    pub fn build(self) -> Result<Client> {
        let mut base_url = self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;
        let user_agent = self.user_agent.unwrap_or_else(|| USER_AGENT.to_owned());

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&user_agent, self.timeout)?),
        };
        let token_store = self
            .token_store
            .unwrap_or_else(|| Arc::new(FileTokenStore::from_env()));

        let mut credentials = Credentials::new(token_store);
        if let Some(token) = &self.github_api_token {
            credentials.adopt_token(credentials::validated_token(token)?, self.token_scopes);
        }

        Ok(Client {
            base_url,
            user_agent,
            credentials,
            transport,
            context: self.context.unwrap_or_else(Context::shared),
            page_options: self.page_options,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Client {
    /// Base URL to use for API requests. Defaults to the public GitHub API,
    /// but can be overridden for use with GitHub Enterprise. Always
    /// terminated with a trailing slash.
    base_url: Url,

    /// User agent string sent when communicating with GitHub APIs
    user_agent: String,

    /// Current identity; its `Authorization` header is attached to every
    /// request sent to the `base_url` origin
    credentials: Credentials,

    transport: Arc<dyn Transport>,

    /// Query counter and rate limit cache
    context: Arc<Context>,

    /// Limit and delay used by list endpoints
    page_options: PageOptions,
}

impl Client {
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn identity(&self) -> &Identity {
        self.credentials.identity()
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Number of requests dispatched through this client's context
    pub fn query_count(&self) -> u64 {
        self.context.query_count()
    }

    pub fn page_options(&self) -> PageOptions {
        self.page_options
    }

    pub(crate) fn resolve(&self, url: &str) -> Result<Url> {
        if url.starts_with("https://") || url.starts_with("http://") {
            Ok(Url::parse(url)?)
        } else {
            Ok(self.base_url.join(url.trim_start_matches('/'))?)
        }
    }

    /// Issue one request as the current identity.
    ///
    /// The verb and required scopes are checked before anything is sent.
    /// A status outside of the expected set comes back as `Error::Api`; nothing
    /// is retried.
    pub fn execute(&self, request: Request) -> Result<Response<Value>> {
        let expected = request.expected_statuses()?;
        self.credentials.check_scopes(&request.scopes)?;
        self.dispatch(self.credentials.identity(), request, &expected)
    }

    /// Issue one request as `identity`, skipping the scope check
    pub(crate) fn execute_as(
        &self,
        identity: &Identity,
        request: Request,
    ) -> Result<Response<Value>> {
        let expected = request.expected_statuses()?;
        self.dispatch(identity, request, &expected)
    }

    fn dispatch(
        &self,
        identity: &Identity,
        request: Request,
        expected: &[StatusCode],
    ) -> Result<Response<Value>> {
        let mut url = self.resolve(&request.url)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(MEDIA_TYPE_V3));
        // Credentials only ever go to the host they were issued for
        if url.origin() == self.base_url.origin() {
            if let Some(authorization) = identity.authorization_header_value() {
                headers.insert(header::AUTHORIZATION, authorization);
            }
        } else if !identity.is_anonymous() {
            debug!(
                "withholding credentials from {}",
                url.origin().ascii_serialization()
            );
        }

        let query = self.context.record_query();
        debug!("Github Request #{}: {} {}", query, request.method, url);

        let response = self.transport.send(HttpRequest {
            method: request.method,
            url,
            headers,
            body: request.body,
        })?;
        debug!("Github Response #{}: {}", query, response.status);

        self.process_response(response, expected)
    }

    // Process a response received from Github. This sorts out failures
    // (rate limits, missing resources, etc.) and then parses the json payload.
    fn process_response(
        &self,
        response: HttpResponse,
        expected: &[StatusCode],
    ) -> Result<Response<Value>> {
        let HttpResponse {
            status,
            headers,
            body,
        } = response;

        if !expected.contains(&status) {
            let kind = classify(status, &headers);
            return Err(ApiError::new(status, kind, headers, body).into());
        }

        let payload = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)?
        };

        let oauth_scopes = headers
            .get(HEADER_OAUTH_SCOPES)
            .and_then(|h| h.to_str().ok())
            .map(parse_scopes);

        Ok(Response {
            pagination: Pagination::from_headers(&headers),
            rate: Rate::from_headers(&headers),
            oauth_scopes,
            inner: payload,
        })
    }

    pub fn users(&self) -> UsersClient {
        UsersClient::new(self)
    }

    pub fn repos(&self) -> RepositoryClient {
        RepositoryClient::new(self)
    }

    pub fn issues(&self) -> IssuesClient {
        IssuesClient::new(self)
    }

    pub fn labels(&self) -> LabelsClient {
        LabelsClient::new(self)
    }

    pub fn rate_limit(&self) -> RateLimitClient {
        RateLimitClient::new(self)
    }
}
