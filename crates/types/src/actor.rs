//! Simulated users and the actions they perform.

use crate::records::{PostRecord, RegistrationResponse};
use crate::{PostId, UserId};
use std::fmt;

/// A simulated end-user identity.
///
/// Created once by registration and immutable afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
    pub password: String,
    pub email: String,
    /// Bearer token issued at registration.
    pub token: String,
    /// Remote user id.
    pub user_id: UserId,
}

impl Actor {
    /// Combine the credentials used to register with the registration response.
    pub fn from_registration(password: &str, response: RegistrationResponse) -> Self {
        Self {
            username: response.user.username,
            password: password.to_string(),
            email: response.user.email,
            token: response.token,
            user_id: response.user.id,
        }
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.username, self.user_id)
    }
}

/// A content item created on behalf of an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub id: PostId,
    pub title: String,
    pub body: String,
    pub author_id: UserId,
}

impl From<PostRecord> for ContentItem {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title,
            body: post.content,
            author_id: post.author,
        }
    }
}

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteDirection {
    Like,
    Dislike,
}

impl VoteDirection {
    /// Path segment of the vote endpoint.
    pub fn path_segment(self) -> &'static str {
        match self {
            VoteDirection::Like => "like",
            VoteDirection::Dislike => "dislike",
        }
    }

    /// Signed weight as stored by the API.
    pub fn weight(self) -> i8 {
        match self {
            VoteDirection::Like => 1,
            VoteDirection::Dislike => -1,
        }
    }

    /// Interpret a signed weight. Zero has no direction.
    pub fn from_weight(weight: i8) -> Option<Self> {
        match weight {
            w if w > 0 => Some(VoteDirection::Like),
            w if w < 0 => Some(VoteDirection::Dislike),
            _ => None,
        }
    }
}

/// A vote cast by an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteAction {
    /// Remote vote id, when the API reports one.
    pub vote_id: Option<u64>,
    pub content_id: PostId,
    pub direction: VoteDirection,
    /// Issuing user. `None` when the API left it out of the response and the
    /// client had not looked up its identity yet.
    pub actor_id: Option<UserId>,
}
