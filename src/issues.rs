use super::{DateTime, NodeId, User};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub node_id: NodeId,
    pub url: String,
    pub html_url: String,
    pub number: u64,
    pub state: String,
    pub title: String,
    pub body: Option<String>,
    pub user: User,
    pub labels: Vec<Label>,
    pub assignee: Option<User>,
    #[serde(default)]
    pub assignees: Vec<User>,
    pub locked: bool,
    pub comments: u64,
    pub pull_request: Option<PullRequestRef>,
    pub closed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PullRequestRef {
    pub url: String,
    pub html_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Label {
    pub id: u64,
    pub node_id: NodeId,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub default: bool,
}

#[cfg(test)]
mod test {
    use super::Issue;

    #[test]
    fn pull_request_issue() {
        const ISSUE_JSON: &str = r#"
            {
                "id": 1,
                "node_id": "MDU6SXNzdWUx",
                "url": "https://api.github.com/repos/octocat/Hello-World/issues/1347",
                "html_url": "https://github.com/octocat/Hello-World/issues/1347",
                "number": 1347,
                "state": "open",
                "title": "Found a bug",
                "body": "I'm having a problem with this.",
                "user": {
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
                "labels": [
                    {
                        "id": 208045946,
                        "node_id": "MDU6TGFiZWwyMDgwNDU5NDY=",
                        "url": "https://api.github.com/repos/octocat/Hello-World/labels/bug",
                        "name": "bug",
                        "description": "Something isn't working",
                        "color": "f29513",
                        "default": true
                    }
                ],
                "assignee": null,
                "locked": false,
                "comments": 0,
                "pull_request": {
                    "url": "https://api.github.com/repos/octocat/Hello-World/pulls/1347",
                    "html_url": "https://github.com/octocat/Hello-World/pull/1347"
                },
                "closed_at": null,
                "created_at": "2011-04-22T13:33:48Z",
                "updated_at": "2011-04-22T13:33:48Z"
            }
        "#;

        let issue: Issue = serde_json::from_str(ISSUE_JSON).unwrap();
        assert!(issue.is_pull_request());
        assert_eq!(issue.labels[0].name, "bug");
        assert!(issue.assignees.is_empty());
    }
}
