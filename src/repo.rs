use super::{DateTime, NodeId, User};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub node_id: NodeId,
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub owner: User,
    pub html_url: String,
    pub description: Option<String>,
    pub fork: bool,
    pub url: String,
    pub clone_url: Option<String>,
    pub ssh_url: Option<String>,
    pub homepage: Option<String>,
    pub language: Option<String>,
    pub default_branch: Option<String>,
    pub stargazers_count: Option<u64>,
    pub open_issues_count: Option<u64>,
    pub has_issues: Option<bool>,
    pub archived: Option<bool>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    pub pushed_at: Option<DateTime>,
}
