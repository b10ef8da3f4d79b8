use crate::{
    client::{
        segment, Client, Pages, PaginationOptions, Request, Result, SortDirection, SortPages,
        StateFilter,
    },
    DateTime, Issue,
};
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct ListIssuesForRepoOptions {
    // If an integer is passed, it should refer to a milestone by its number field. If the string *
    // is passed, issues with any milestone are accepted. If the string none is passed, issues
    // without milestones are returned.
    pub milestone: Option<MilestoneFilter>,

    /// Indicates the state of the issues to return. Default: open
    pub state: Option<StateFilter>,

    /// Can be the name of a user. Pass in none for issues with no assigned user, and * for issues
    /// assigned to any user.
    pub assignee: Option<String>,

    /// The user that created the issue.
    pub creator: Option<String>,

    /// A user that's mentioned in the issue.
    pub mentioned: Option<String>,

    /// A list of comma separated label names. Example: bug,ui,@high
    pub labels: Vec<String>,

    /// What to sort results by. Default: created
    pub sort: Option<SortPages>,

    /// The direction of the sort. Default: desc
    pub direction: Option<SortDirection>,

    /// Only issues updated at or after this time are returned. This is a timestamp in ISO 8601 format: YYYY-MM-DDTHH:MM:SSZ.
    pub since: Option<DateTime>,

    #[serde(flatten)]
    pub pagination_options: PaginationOptions,
}

#[derive(Debug)]
pub enum MilestoneFilter {
    Number(u64),
    Any,
    None,
}

impl Serialize for MilestoneFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match self {
            MilestoneFilter::Number(v) => serializer.serialize_u64(*v),
            MilestoneFilter::Any => serializer.serialize_str("*"),
            MilestoneFilter::None => serializer.serialize_str("none"),
        }
    }
}

/// `IssuesClient` handles communication with the issues related methods of the GitHub API.
///
/// GitHub API docs: https://developer.github.com/v3/issues/
pub struct IssuesClient<'a> {
    inner: &'a Client,
}

impl<'a> IssuesClient<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { inner: client }
    }

    /// List issues for a repository. Pull requests are included, see
    /// `Issue::is_pull_request`.
    ///
    /// GitHub API docs: https://developer.github.com/v3/issues/#list-issues-for-a-repository
    pub fn list_for_repo(
        &self,
        owner: &str,
        repo: &str,
        options: Option<ListIssuesForRepoOptions>,
    ) -> Pages<Issue> {
        let url = match (segment(owner), segment(repo)) {
            (Ok(owner), Ok(repo)) => format!("repos/{}/{}/issues", owner, repo),
            (Err(e), _) | (_, Err(e)) => return Pages::failed(e),
        };
        self.inner.fetch_list(&url, &options)
    }

    /// Get a single issue
    ///
    /// GitHub API docs: https://developer.github.com/v3/issues/#get-a-single-issue
    pub fn get(&self, owner: &str, repo: &str, issue_number: u64) -> Result<Issue> {
        let url = format!(
            "repos/{}/{}/issues/{}",
            segment(owner)?,
            segment(repo)?,
            issue_number
        );
        self.inner.execute(Request::get(url))?.json().map(|r| r.into_inner())
    }
}
