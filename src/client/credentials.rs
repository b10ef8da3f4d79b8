use crate::client::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::BTreeSet,
    env, fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Environment variable overriding where the token file lives
pub const TOKEN_FILE_ENV: &str = "GITHUB_TOKEN_FILE";
/// Token file used when `GITHUB_TOKEN_FILE` is unset, relative to the working directory
pub const DEFAULT_TOKEN_FILE: &str = ".github-token";

pub type ScopeSet = BTreeSet<String>;

/// Who the client is acting as.
///
/// Identities only ever move forward: `Anonymous` to `BasicCredentialed` to
/// `TokenAuthenticated`, or straight from `Anonymous` to `TokenAuthenticated`.
#[derive(Debug)]
pub enum Identity {
    Anonymous,
    BasicCredentialed {
        username: String,
        password: SecretString,
    },
    TokenAuthenticated {
        token: SecretString,
        username: Option<String>,
        // Held only between minting a token and `clear_password`
        password: Option<SecretString>,
    },
}

impl Identity {
    pub(crate) fn basic(username: &str, password: &str) -> Result<Self> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::InvalidCredentials);
        }

        Ok(Identity::BasicCredentialed {
            username: username.to_owned(),
            password: SecretString::from(password.to_owned()),
        })
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn is_basic(&self) -> bool {
        matches!(self, Identity::BasicCredentialed { .. })
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Identity::TokenAuthenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::BasicCredentialed { username, .. } => Some(username),
            Identity::TokenAuthenticated { username, .. } => username.as_deref(),
        }
    }

    pub fn has_password(&self) -> bool {
        match self {
            Identity::Anonymous => false,
            Identity::BasicCredentialed { .. } => true,
            Identity::TokenAuthenticated { password, .. } => password.is_some(),
        }
    }

    pub fn token(&self) -> Option<&SecretString> {
        match self {
            Identity::TokenAuthenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Value for the `Authorization` header, or `None` when anonymous.
    pub fn authorization_header_value(&self) -> Option<HeaderValue> {
        let value = match self {
            Identity::Anonymous => return None,
            Identity::BasicCredentialed { username, password } => {
                let encoded =
                    STANDARD.encode(format!("{}:{}", username, password.expose_secret()));
                format!("Basic {}", encoded)
            }
            Identity::TokenAuthenticated { token, .. } => {
                format!("token {}", token.expose_secret())
            }
        };

        // Tokens and base64 are plain ascii; anything else was rejected when stored
        let mut value = HeaderValue::from_str(&value).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

/// Somewhere to keep a token between runs.
pub trait TokenStore: fmt::Debug + Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
}

/// Stores the token as the only contents of a plain text file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Token file named by `GITHUB_TOKEN_FILE`, falling back to `.github-token`
    pub fn from_env() -> Self {
        let path = env::var_os(TOKEN_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim_end();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_owned()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        debug!("writing token to {}", self.path.display());
        fs::write(&self.path, token)?;
        Ok(())
    }
}

/// Keeps the token in memory only
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let token = self.token.lock().unwrap_or_else(|p| p.into_inner());
        Ok(token.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        let mut stored = self.token.lock().unwrap_or_else(|p| p.into_inner());
        *stored = Some(token.to_owned());
        Ok(())
    }
}

/// The client's current identity together with the scopes it was granted.
#[derive(Debug)]
pub struct Credentials {
    identity: Identity,
    // `None` for a token whose scopes have not been verified
    scopes: Option<ScopeSet>,
    store: Arc<dyn TokenStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            identity: Identity::Anonymous,
            scopes: Some(ScopeSet::new()),
            store,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Scopes known to be granted. `None` means the token was adopted without
    /// verification, or the identity is a username/password pair, which is
    /// unrestricted.
    pub fn scopes(&self) -> Option<&ScopeSet> {
        match self.identity {
            Identity::BasicCredentialed { .. } => None,
            _ => self.scopes.as_ref(),
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn set_basic_credentials(&mut self, username: &str, password: &str) -> Result<()> {
        let identity = Identity::basic(username, password)?;
        if self.identity.is_token() {
            return Err(Error::AlreadyAuthenticated);
        }

        info!("using basic credentials for {}", username);
        self.identity = identity;
        Ok(())
    }

    /// Validate, persist and adopt `token`, returning the trimmed value
    pub fn set_token(&mut self, token: &str) -> Result<String> {
        self.set_token_with_scopes(token, None)
    }

    pub(crate) fn set_token_with_scopes(
        &mut self,
        token: &str,
        scopes: Option<ScopeSet>,
    ) -> Result<String> {
        let token = validated_token(token)?;
        self.store.save(&token)?;
        self.adopt_token(token.clone(), scopes);
        Ok(token)
    }

    /// Adopt a token minted with the basic credentials in `login`. Nothing
    /// changes unless the token is valid and was persisted.
    pub(crate) fn set_token_from_login(
        &mut self,
        login: Identity,
        token: &str,
        scopes: Option<ScopeSet>,
    ) -> Result<String> {
        let token = validated_token(token)?;
        self.store.save(&token)?;
        self.identity = login;
        self.adopt_token(token.clone(), scopes);
        Ok(token)
    }

    /// Switch to `token` without persisting or verifying it
    pub(crate) fn adopt_token(&mut self, token: String, scopes: Option<ScopeSet>) {
        let previous = std::mem::replace(&mut self.identity, Identity::Anonymous);
        let (username, password) = match previous {
            Identity::Anonymous => (None, None),
            Identity::BasicCredentialed { username, password } => (Some(username), Some(password)),
            Identity::TokenAuthenticated {
                username, password, ..
            } => (username, password),
        };

        info!(
            "authenticated with token{}",
            username
                .as_ref()
                .map(|u| format!(" as {}", u))
                .unwrap_or_default()
        );

        self.identity = Identity::TokenAuthenticated {
            token: SecretString::from(token),
            username,
            password,
        };
        self.scopes = scopes;
    }

    pub(crate) fn set_scopes(&mut self, scopes: ScopeSet) {
        if self.identity.is_token() {
            self.scopes = Some(scopes);
        }
    }

    /// Forget the password once it has been exchanged for a token. The
    /// username is kept for display.
    pub fn clear_password(&mut self) {
        if let Identity::TokenAuthenticated { password, .. } = &mut self.identity {
            password.take();
        }
    }

    pub fn authorization_header_value(&self) -> Option<HeaderValue> {
        self.identity.authorization_header_value()
    }

    /// Check that every scope in `required` has been granted
    pub fn check_scopes(&self, required: &ScopeSet) -> Result<()> {
        if required.is_empty() {
            return Ok(());
        }

        let granted = match self.scopes() {
            Some(granted) => granted,
            None => return Ok(()),
        };

        let missing: ScopeSet = required.difference(granted).cloned().collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::InsufficientScope { missing })
        }
    }
}

/// Trim `token`, rejecting it if nothing usable is left
pub(crate) fn validated_token(token: &str) -> Result<String> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::InvalidToken);
    }
    // Control characters cannot go into a header
    if HeaderValue::from_str(token).is_err() {
        return Err(Error::InvalidToken);
    }
    Ok(token.to_owned())
}

/// Split a comma separated scope list, as found in `X-OAuth-Scopes`
pub fn parse_scopes(header: &str) -> ScopeSet {
    header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    fn scopes(s: &[&str]) -> ScopeSet {
        s.iter().map(|s| (*s).to_owned()).collect()
    }

    fn credentials() -> Credentials {
        Credentials::new(Arc::new(MemoryTokenStore::new()))
    }

    #[test]
    fn anonymous_has_no_header() {
        let c = credentials();
        assert!(c.identity().is_anonymous());
        assert!(c.authorization_header_value().is_none());
    }

    #[test]
    fn basic_header() {
        let mut c = credentials();
        c.set_basic_credentials("user", "pass").unwrap();
        assert!(c.identity().is_basic());
        assert_eq!(
            c.authorization_header_value().unwrap().to_str().unwrap(),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn basic_credentials_must_be_non_empty() {
        let mut c = credentials();
        assert!(matches!(
            c.set_basic_credentials("", "pass"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            c.set_basic_credentials("user", ""),
            Err(Error::InvalidCredentials)
        ));
        assert!(c.identity().is_anonymous());
    }

    #[test]
    fn empty_tokens_are_rejected() {
        let mut c = credentials();
        assert!(matches!(c.set_token(""), Err(Error::InvalidToken)));
        assert!(matches!(c.set_token("   "), Err(Error::InvalidToken)));
        assert!(c.identity().is_anonymous());
        assert_eq!(c.store().load().unwrap(), None);
    }

    #[test]
    fn token_is_trimmed_and_persisted() {
        let mut c = credentials();
        assert_eq!(c.set_token(" abc ").unwrap(), "abc");
        assert_eq!(c.identity().token().unwrap().expose_secret(), "abc");
        assert_eq!(
            c.authorization_header_value().unwrap().to_str().unwrap(),
            "token abc"
        );
        assert_eq!(c.store().load().unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn token_keeps_username_and_drops_password_on_clear() {
        let mut c = credentials();
        c.set_basic_credentials("octocat", "hunter2").unwrap();
        c.set_token("abc").unwrap();
        assert!(c.identity().has_password());

        c.clear_password();
        assert!(!c.identity().has_password());
        assert_eq!(c.identity().username(), Some("octocat"));
    }

    #[test]
    fn no_downgrade_from_token() {
        let mut c = credentials();
        c.set_token("abc").unwrap();
        assert!(matches!(
            c.set_basic_credentials("user", "pass"),
            Err(Error::AlreadyAuthenticated)
        ));
        assert!(c.identity().is_token());
    }

    #[test]
    fn scope_check() {
        let mut c = credentials();
        assert!(c.check_scopes(&ScopeSet::new()).is_ok());
        assert!(matches!(
            c.check_scopes(&scopes(&["repo"])),
            Err(Error::InsufficientScope { .. })
        ));

        c.adopt_token("abc".to_owned(), None);
        // unverified tokens defer to the server
        assert!(c.check_scopes(&scopes(&["repo"])).is_ok());

        c.set_scopes(scopes(&["public_repo", "gist"]));
        match c.check_scopes(&scopes(&["repo", "gist"])) {
            Err(Error::InsufficientScope { missing }) => assert_eq!(missing, scopes(&["repo"])),
            other => panic!("unexpected {:?}", other),
        }
        assert!(c.check_scopes(&scopes(&["gist"])).is_ok());
    }

    #[test]
    fn parse_scope_header() {
        assert_eq!(
            parse_scopes("repo, user:email,gist"),
            scopes(&["gist", "repo", "user:email"])
        );
        assert!(parse_scopes("").is_empty());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        assert_eq!(store.load().unwrap(), None);

        std::fs::write(store.path(), "abc123\n\n").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc123"));

        store.save("def456").unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "def456");
    }
}
