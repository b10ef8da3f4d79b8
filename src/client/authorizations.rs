use crate::{
    client::{
        credentials::validated_token, Client, Error, Identity, ListReposOptions, Pages, Request,
        Result, ScopeSet,
    },
    Authorization, Email, Gist, Repository, User,
};
use log::{info, warn};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Scopes requested for a token when the caller doesn't pick any
pub const DEFAULT_SCOPES: &[&str] = &["user", "public_repo", "repo", "gist"];

/// Every scope Github will grant to a personal access token
///
/// GitHub API docs: https://developer.github.com/apps/building-oauth-apps/understanding-scopes-for-oauth-apps/
pub const VALID_SCOPES: &[&str] = &[
    "user",
    "user:email",
    "user:follow",
    "public_repo",
    "repo",
    "repo_deployment",
    "repo:status",
    "delete_repo",
    "notifications",
    "gist",
    "read:repo_hook",
    "write:repo_hook",
    "admin:repo_hook",
    "admin:org_hook",
    "read:org",
    "write:org",
    "admin:org",
    "read:public_key",
    "write:public_key",
    "admin:public_key",
    "read:gpg_key",
    "write:gpg_key",
    "admin:gpg_key",
];

pub fn is_valid_scope(scope: &str) -> bool {
    VALID_SCOPES.iter().any(|s| s.eq_ignore_ascii_case(scope))
}

#[derive(Debug, Serialize)]
struct AuthorizationRequest<'a> {
    scopes: Vec<String>,
    note: &'a str,
}

// Map the failure of a request made with a username and password
fn login_failure(error: Error) -> Error {
    match error {
        Error::Api(e) if e.requires_otp() => {
            warn!("Github requires a two-factor code for this account");
            Error::TwoFactorRequired
        }
        Error::Api(e) => {
            warn!("Github rejected the username and password: {}", e);
            Error::AuthenticationFailed(e)
        }
        other => other,
    }
}

impl Client {
    pub fn set_basic_credentials(&mut self, username: &str, password: &str) -> Result<()> {
        self.credentials.set_basic_credentials(username, password)?;
        self.identity_changed();
        Ok(())
    }

    /// Validate, persist and switch to `token`, returning the trimmed value
    pub fn set_token(&mut self, token: &str) -> Result<String> {
        let token = self.credentials.set_token(token)?;
        self.identity_changed();
        Ok(token)
    }

    // The cached quota belongs to the previous identity
    fn identity_changed(&self) {
        self.context.invalidate_rate_limits();
    }

    pub fn clear_password(&mut self) {
        self.credentials.clear_password()
    }

    /// Adopt the token kept in the token store, if there is one. The token is
    /// not verified.
    pub fn restore_token(&mut self) -> Result<bool> {
        let token = match self.credentials.store().load()? {
            Some(token) if !token.trim().is_empty() => validated_token(&token)?,
            _ => return Ok(false),
        };

        self.credentials.adopt_token(token, None);
        self.identity_changed();
        Ok(true)
    }

    /// Check `username` and `password` against Github.
    ///
    /// With `auto_create_token` the password is exchanged for a new personal
    /// access token which is persisted and used from then on. Otherwise the
    /// client keeps using the username and password. On failure the identity
    /// is left untouched.
    pub fn login(
        &mut self,
        username: &str,
        password: &str,
        auto_create_token: bool,
    ) -> Result<()> {
        let candidate = Identity::basic(username, password)?;
        if self.identity().is_token() {
            return Err(Error::AlreadyAuthenticated);
        }

        self.execute_as(&candidate, Request::get("user"))
            .map_err(login_failure)?;
        info!("logged in to Github as {}", username);

        if !auto_create_token {
            return self.set_basic_credentials(username, password);
        }

        let (token, scopes) = self.request_authorization(&candidate, None, None)?;
        self.credentials
            .set_token_from_login(candidate, &token, scopes)?;
        self.credentials.clear_password();
        self.identity_changed();
        Ok(())
    }

    /// Mint a personal access token with the current username and password
    /// and switch to it. Returns the new token.
    ///
    /// `scopes` defaults to `DEFAULT_SCOPES`, `note` to the crate name and
    /// the current time.
    ///
    /// GitHub API docs: https://developer.github.com/v3/oauth_authorizations/#create-a-new-authorization
    pub fn create_authorization(
        &mut self,
        scopes: Option<&[&str]>,
        note: Option<&str>,
    ) -> Result<String> {
        let identity = self.credentials.identity();
        match identity {
            Identity::Anonymous => return Err(Error::InvalidCredentials),
            Identity::TokenAuthenticated { .. } => return Err(Error::AlreadyAuthenticated),
            Identity::BasicCredentialed { .. } => {}
        }

        let (token, granted) = self.request_authorization(identity, scopes, note)?;
        let token = self.credentials.set_token_with_scopes(&token, granted)?;
        self.credentials.clear_password();
        self.identity_changed();
        Ok(token)
    }

    fn request_authorization(
        &self,
        identity: &Identity,
        scopes: Option<&[&str]>,
        note: Option<&str>,
    ) -> Result<(String, Option<ScopeSet>)> {
        let scopes = scopes.unwrap_or(DEFAULT_SCOPES);
        if let Some(invalid) = scopes.iter().find(|s| !is_valid_scope(s)) {
            return Err(Error::InvalidScope((*invalid).to_owned()));
        }

        let default_note;
        let note = match note {
            Some(note) => note,
            None => {
                default_note = format!(
                    "{} {}",
                    env!("CARGO_PKG_NAME"),
                    self.context.now().to_rfc3339()
                );
                &default_note
            }
        };

        let body = AuthorizationRequest {
            scopes: scopes.iter().map(|s| (*s).to_owned()).collect(),
            note,
        };
        let request = Request::post("authorizations").json(&body)?;
        let authorization: Authorization = self
            .execute_as(identity, request)
            .map_err(login_failure)?
            .json()?
            .into_inner();

        let token = authorization
            .token
            .ok_or("authorization response did not include a token")?;
        let granted = if authorization.scopes.is_empty() {
            body.scopes.into_iter().collect()
        } else {
            authorization.scopes.into_iter().collect()
        };

        info!("created authorization {}", authorization.id);
        Ok((token, Some(granted)))
    }

    /// Ask Github which scopes the current token has and remember them.
    /// Returns `None`, leaving the scopes unknown, when Github doesn't say.
    pub fn verify_token(&mut self) -> Result<Option<ScopeSet>> {
        if !self.identity().is_token() {
            return Err(Error::NotAuthenticated);
        }

        let response = self.execute(Request::get("user"))?;
        let scopes = response.oauth_scopes().cloned();
        if let Some(scopes) = &scopes {
            self.credentials.set_scopes(scopes.clone());
        }
        Ok(scopes)
    }

    /// Endpoints that only make sense for a token, available once the client
    /// holds one
    pub fn authenticated(&self) -> Result<AuthenticatedClient<'_>> {
        if self.identity().is_token() {
            Ok(AuthenticatedClient { inner: self })
        } else {
            Err(Error::NotAuthenticated)
        }
    }
}

/// `AuthenticatedClient` handles the methods of the GitHub API that act on
/// the authenticated user.
///
/// GitHub API docs: https://developer.github.com/v3/users/
pub struct AuthenticatedClient<'a> {
    inner: &'a Client,
}

impl<'a> AuthenticatedClient<'a> {
    /// Get the authenticated user
    ///
    /// GitHub API docs: https://developer.github.com/v3/users/#get-the-authenticated-user
    pub fn current_user(&self) -> Result<User> {
        self.inner
            .execute(Request::get("user"))?
            .json()
            .map(|r| r.into_inner())
    }

    /// GitHub API docs: https://developer.github.com/v3/users/emails/#list-email-addresses-for-a-user
    pub fn emails(&self) -> Pages<Email> {
        self.inner.fetch_list("user/emails", &())
    }

    /// List repositories the authenticated user has explicit permission to access
    ///
    /// GitHub API docs: https://developer.github.com/v3/repos/#list-your-repositories
    pub fn repos(&self, options: Option<ListReposOptions>) -> Pages<Repository> {
        self.inner.fetch_list("user/repos", &options)
    }

    /// GitHub API docs: https://developer.github.com/v3/activity/starring/#star-a-repository
    pub fn star(&self, owner: &str, repo: &str) -> Result<()> {
        let url = starred_url(owner, repo)?;
        self.inner
            .execute(Request::put(url).expect(&[StatusCode::NO_CONTENT]))?;
        Ok(())
    }

    /// GitHub API docs: https://developer.github.com/v3/activity/starring/#unstar-a-repository
    pub fn unstar(&self, owner: &str, repo: &str) -> Result<()> {
        self.inner.execute(Request::delete(starred_url(owner, repo)?))?;
        Ok(())
    }

    /// Create a gist from `files`, a map of file name to content
    ///
    /// GitHub API docs: https://developer.github.com/v3/gists/#create-a-gist
    pub fn create_gist(
        &self,
        description: Option<&str>,
        public: bool,
        files: &BTreeMap<String, String>,
    ) -> Result<Gist> {
        let files: BTreeMap<_, _> = files
            .iter()
            .map(|(name, content)| (name.as_str(), json!({ "content": content })))
            .collect();
        let request = Request::post("gists")
            .json(&json!({
                "description": description,
                "public": public,
                "files": files,
            }))?
            .scopes(vec!["gist"]);

        self.inner.execute(request)?.json().map(|r| r.into_inner())
    }
}

fn starred_url(owner: &str, repo: &str) -> Result<String> {
    Ok(format!(
        "user/starred/{}/{}",
        super::segment(owner)?,
        super::segment(repo)?
    ))
}
