use crate::{
    client::{segment, Client, Pages, Request, Result},
    Label,
};

/// `LabelsClient` handles communication with the label related methods of the GitHub API.
///
/// GitHub API docs: https://developer.github.com/v3/issues/labels/
pub struct LabelsClient<'a> {
    inner: &'a Client,
}

impl<'a> LabelsClient<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { inner: client }
    }

    /// List labels for this Repository
    ///
    /// Github API docs: https://developer.github.com/v3/issues/labels/#list-all-labels-for-this-repository
    pub fn list_for_repo(&self, owner: &str, repo: &str) -> Pages<Label> {
        let url = match (segment(owner), segment(repo)) {
            (Ok(owner), Ok(repo)) => format!("repos/{}/{}/labels", owner, repo),
            (Err(e), _) | (_, Err(e)) => return Pages::failed(e),
        };
        self.inner.fetch_list(&url, &())
    }

    /// Get a single label
    ///
    /// GitHub API docs: https://developer.github.com/v3/issues/labels/#get-a-single-label
    pub fn get(&self, owner: &str, repo: &str, name: &str) -> Result<Label> {
        let url = format!(
            "repos/{}/{}/labels/{}",
            segment(owner)?,
            segment(repo)?,
            segment(name)?
        );
        self.inner.execute(Request::get(url))?.json().map(|r| r.into_inner())
    }
}
