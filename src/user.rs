use super::{DateTime, NodeId};
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub enum UserType {
    Bot,
    Organization,
    User,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub login: String,
    pub id: u64,
    pub node_id: NodeId,
    pub avatar_url: String,
    pub url: String,
    pub html_url: String,
    pub repos_url: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub site_admin: bool,

    // Only present when fetching a single user
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub public_repos: Option<u64>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

/// An address from `GET /user/emails`
#[derive(Clone, Debug, Deserialize)]
pub struct Email {
    pub email: String,
    pub verified: bool,
    pub primary: bool,
    pub visibility: Option<String>,
}

#[cfg(test)]
mod test {
    use super::{User, UserType};

    #[test]
    fn user() {
        const USER_JSON: &str = r#"
            {
                "login": "octocat",
                "id": 1,
                "node_id": "MDQ6VXNlcjE=",
                "avatar_url": "https://github.com/images/error/octocat_happy.gif",
                "gravatar_id": "",
                "url": "https://api.github.com/users/octocat",
                "html_url": "https://github.com/octocat",
                "repos_url": "https://api.github.com/users/octocat/repos",
                "type": "User",
                "site_admin": false,
                "name": "monalisa octocat",
                "company": "GitHub",
                "blog": "https://github.com/blog",
                "location": "San Francisco",
                "email": "octocat@github.com",
                "bio": "There once was...",
                "public_repos": 2,
                "followers": 20,
                "following": 0,
                "created_at": "2008-01-14T04:33:35Z",
                "updated_at": "2008-01-14T04:33:35Z"
            }
        "#;

        let user: User = serde_json::from_str(USER_JSON).unwrap();
        assert_eq!(user.user_type, UserType::User);
        assert_eq!(user.public_repos, Some(2));
        assert!(user.created_at.is_some());
    }

    #[test]
    fn org_summary() {
        const ORGANIZATION_JSON: &str = r#"
            {
                "login": "Octocoders",
                "id": 38302899,
                "node_id": "MDEyOk9yZ2FuaXphdGlvbjM4MzAyODk5",
                "avatar_url": "https://avatars1.githubusercontent.com/u/38302899?v=4",
                "url": "https://api.github.com/users/Octocoders",
                "html_url": "https://github.com/Octocoders",
                "repos_url": "https://api.github.com/users/Octocoders/repos",
                "type": "Organization",
                "site_admin": false
            }
        "#;

        let user: User = serde_json::from_str(ORGANIZATION_JSON).unwrap();
        assert_eq!(user.user_type, UserType::Organization);
        assert!(user.name.is_none());
    }
}
