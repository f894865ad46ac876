//! Request and response bodies for the content-and-voting API.

use crate::{PostId, UserId};
use serde::{Deserialize, Serialize};

/// Credentials posted to `auth` to obtain a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Token posted to `auth/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

/// Response carrying a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Body posted to `auth/registration`.
///
/// The API wants the password twice, as a sign-up form would.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub password1: String,
    pub password2: String,
    pub email: String,
}

impl RegistrationRequest {
    /// Build a registration body with a confirmed password.
    pub fn new(username: &str, password: &str, email: &str) -> Self {
        Self {
            username: username.to_string(),
            password1: password.to_string(),
            password2: password.to_string(),
            email: email.to_string(),
        }
    }
}

/// Response from `auth/registration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub user: UserRecord,
    pub token: String,
}

/// A user as listed by `users` and `users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub groups: Vec<u64>,
}

/// Body posted to `posts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPostRequest {
    pub title: String,
    pub content: String,
    pub author: UserId,
}

/// A post as returned by `posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    pub author: UserId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub dislikes: u64,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub updated_on: Option<String>,
}

/// A vote as returned by `posts/{id}/like` and `posts/{id}/dislike`.
///
/// Every field is optional on the wire; the client fills gaps from the
/// request it issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    #[serde(default)]
    pub id: Option<u64>,
    /// `+1` for a like, `-1` for a dislike.
    #[serde(default)]
    pub vote: i8,
    #[serde(default)]
    pub author: Option<UserId>,
    #[serde(default)]
    pub object_id: Option<PostId>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_request_repeats_password() {
        let req = RegistrationRequest::new("alice", "s3cret", "a@b.com");
        assert_eq!(req.password1, "s3cret");
        assert_eq!(req.password2, "s3cret");
    }

    #[test]
    fn test_post_record_tolerates_missing_optional_fields() {
        let post: PostRecord =
            serde_json::from_str(r#"{"id": 7, "title": "hello", "author": 3}"#).unwrap();
        assert_eq!(post.id, 7);
        assert_eq!(post.likes, 0);
        assert!(post.slug.is_empty());
        assert!(post.created_on.is_none());
    }

    #[test]
    fn test_vote_record_from_sparse_body() {
        let vote: VoteRecord = serde_json::from_str(r#"{"vote": -1}"#).unwrap();
        assert_eq!(vote.vote, -1);
        assert!(vote.id.is_none());
        assert!(vote.author.is_none());
    }

    #[test]
    fn test_user_record_ignores_unknown_fields() {
        let user: UserRecord = serde_json::from_str(
            r#"{"id": 1, "username": "bob", "email": "b@c.com", "groups": [], "is_staff": true}"#,
        )
        .unwrap();
        assert_eq!(user.username, "bob");
    }
}
