use crate::{
    client::{segment, Client, Request, Result},
    User,
};

/// `UsersClient` handles communication with the user related methods of the GitHub API.
///
/// GitHub API docs: https://developer.github.com/v3/users/
pub struct UsersClient<'a> {
    inner: &'a Client,
}

impl<'a> UsersClient<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { inner: client }
    }

    /// Get a single user
    ///
    /// GitHub API docs: https://developer.github.com/v3/users/#get-a-single-user
    pub fn get(&self, login: &str) -> Result<User> {
        let url = format!("users/{}", segment(login)?);
        self.inner.execute(Request::get(url))?.json().map(|r| r.into_inner())
    }
}

#[cfg(test)]
mod test {
    use crate::client::test_support::{json_response, test_client, MockTransport};
    use crate::client::{Error, ErrorKind};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn get_user() {
        let transport = Arc::new(MockTransport::sequence(vec![json_response(
            StatusCode::OK,
            json!({
                "login": "octocat",
                "id": 1,
                "node_id": "MDQ6VXNlcjE=",
                "avatar_url": "https://github.com/images/error/octocat_happy.gif",
                "url": "https://api.github.com/users/octocat",
                "html_url": "https://github.com/octocat",
                "repos_url": "https://api.github.com/users/octocat/repos",
                "type": "User",
                "site_admin": false
            }),
        )]));
        let client = test_client(transport.clone());

        let user = client.users().get("octocat").unwrap();
        assert_eq!(user.login, "octocat");
        assert_eq!(transport.requests()[0].url.path(), "/users/octocat");
    }

    #[test]
    fn dot_segments_are_refused() {
        let transport = Arc::new(MockTransport::sequence(vec![]));
        let client = test_client(transport.clone());

        assert!(matches!(
            client.users().get(".."),
            Err(Error::InvalidPathSegment(_))
        ));
        assert!(client.users().get("").is_err());
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn missing_user() {
        let transport = Arc::new(MockTransport::sequence(vec![json_response(
            StatusCode::NOT_FOUND,
            json!({"message": "Not Found"}),
        )]));
        let client = test_client(transport);

        let error = client.users().get("nobody-at-all").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::NotFound));
    }
}
