use super::DateTime;
use serde::Deserialize;

/// A personal access token as returned by the authorizations API
#[derive(Clone, Debug, Deserialize)]
pub struct Authorization {
    pub id: u64,
    pub url: Option<String>,
    /// Only populated in the response that created the authorization
    pub token: Option<String>,
    pub token_last_eight: Option<String>,
    pub hashed_token: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub note: Option<String>,
    pub note_url: Option<String>,
    pub fingerprint: Option<String>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}
