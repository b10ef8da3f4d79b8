use super::DateTime;
use serde::Deserialize;

/// A gist, as returned when one is created
#[derive(Clone, Debug, Deserialize)]
pub struct Gist {
    pub id: String,
    pub url: String,
    pub html_url: String,
    pub description: Option<String>,
    pub public: bool,
    pub created_at: Option<DateTime>,
}
