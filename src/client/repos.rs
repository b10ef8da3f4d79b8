use crate::{
    client::{segment, Client, Pages, Request, Result, SortDirection},
    Repository,
};
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct ListReposOptions {
    /// Can be one of all, owner, member. Default: owner
    #[serde(rename = "type")]
    pub repo_type: Option<RepoType>,

    /// Can be one of created, updated, pushed, full_name. Default: full_name
    pub sort: Option<String>,

    pub direction: Option<SortDirection>,

    /// Results per page (max 100)
    pub per_page: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoType {
    All,
    Owner,
    Member,
}

/// `RepositoryClient` handles communication with the Repository related methods of the GitHub API.
///
/// GitHub API docs: https://developer.github.com/v3/repos/
pub struct RepositoryClient<'a> {
    inner: &'a Client,
}

impl<'a> RepositoryClient<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { inner: client }
    }

    /// Get a repository
    ///
    /// GitHub API docs: https://developer.github.com/v3/repos/#get
    pub fn get(&self, owner: &str, repo: &str) -> Result<Repository> {
        let url = format!("repos/{}/{}", segment(owner)?, segment(repo)?);
        self.inner.execute(Request::get(url))?.json().map(|r| r.into_inner())
    }

    /// List public repositories for the specified user, following pagination
    /// up to the client's page limit.
    ///
    /// GitHub API docs: https://developer.github.com/v3/repos/#list-user-repositories
    pub fn list_for_user(
        &self,
        user: &str,
        options: Option<ListReposOptions>,
    ) -> Pages<Repository> {
        match segment(user) {
            Ok(user) => self
                .inner
                .fetch_list(&format!("users/{}/repos", user), &options),
            Err(e) => Pages::failed(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ListReposOptions, RepoType};
    use crate::client::{
        test_support::{json_response, test_client, MockTransport},
        PageOptions,
    };
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn repo(name: &str) -> serde_json::Value {
        json!({
            "id": 1296269,
            "node_id": "MDEwOlJlcG9zaXRvcnkxMjk2MjY5",
            "name": name,
            "full_name": format!("octocat/{}", name),
            "private": false,
            "owner": {
                "login": "octocat",
                "id": 1,
                "node_id": "MDQ6VXNlcjE=",
                "avatar_url": "https://github.com/images/error/octocat_happy.gif",
                "url": "https://api.github.com/users/octocat",
                "html_url": "https://github.com/octocat",
                "repos_url": "https://api.github.com/users/octocat/repos",
                "type": "User",
                "site_admin": false
            },
            "html_url": format!("https://github.com/octocat/{}", name),
            "description": null,
            "fork": false,
            "url": format!("https://api.github.com/repos/octocat/{}", name),
            "pushed_at": "2011-01-26T19:06:43Z"
        })
    }

    #[test]
    fn list_for_user_with_options() {
        let transport = Arc::new(MockTransport::sequence(vec![json_response(
            StatusCode::OK,
            json!([repo("Hello-World"), repo("Spoon-Knife")]),
        )]));
        let client = test_client(transport.clone());

        let options = ListReposOptions {
            repo_type: Some(RepoType::Owner),
            per_page: Some(100),
            ..Default::default()
        };
        let pages = client.repos().list_for_user("octocat", Some(options));
        let repos = pages.into_result().unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[1].full_name, "octocat/Spoon-Knife");

        let url = &transport.requests()[0].url;
        assert_eq!(url.path(), "/users/octocat/repos");
        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("per_page".to_owned(), "100".to_owned()),
                ("type".to_owned(), "owner".to_owned()),
            ]
        );
    }

    #[test]
    fn get_repo_escapes_segments() {
        let transport = Arc::new(MockTransport::sequence(vec![json_response(
            StatusCode::OK,
            repo("Hello-World"),
        )]));
        let client = test_client(transport.clone());

        let repository = client.repos().get("octocat", "Hello World").unwrap();
        assert_eq!(repository.name, "Hello-World");
        assert_eq!(
            transport.requests()[0].url.path(),
            "/repos/octocat/Hello%20World"
        );
    }

    #[test]
    fn page_limit_comes_from_client() {
        let transport = Arc::new(MockTransport::new(|_| {
            let mut response = json_response(StatusCode::OK, json!([repo("a"), repo("b")]));
            response.headers.insert(
                "Link",
                r#"<https://api.github.com/users/octocat/repos?page=2>; rel="next""#
                    .parse()
                    .unwrap(),
            );
            Ok(response)
        }));
        let client = crate::Client::builder()
            .transport(transport.clone())
            .context(Arc::new(Default::default()))
            .token_store(Arc::new(crate::client::MemoryTokenStore::new()))
            .page_options(PageOptions::new(1, std::time::Duration::from_secs(0)))
            .build()
            .unwrap();

        let pages = client.repos().list_for_user("octocat", None);
        assert_eq!(pages.items.len(), 2);
        assert_eq!(transport.calls(), 1);
    }
}
