//! Smoke check of an existing account.
//!
//! Logs in with a password, reads the user and post listings, then creates a
//! post and deletes it again. Leaves the API as it found it.

use crate::text::{random_text, BODY_LEN, LOWER_ALNUM, PRINTABLE, TITLE_LEN};
use loadbot_client::{ApiError, ServiceEndpoint};
use loadbot_types::ContentItem;
use rand::Rng;
use tracing::info;

/// What a probe saw.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub users: usize,
    pub posts: usize,
    pub likes: u64,
    pub dislikes: u64,
    /// The post created and then deleted.
    pub created: ContentItem,
}

impl ProbeReport {
    pub fn print(&self) {
        println!("Users:    {}", self.users);
        println!("Posts:    {}", self.posts);
        println!("Likes:    {}", self.likes);
        println!("Dislikes: {}", self.dislikes);
        println!(
            "Created and deleted post #{} {}",
            self.created.id, self.created.title
        );
    }
}

/// Log in as an existing user and touch every endpoint once.
///
/// Stops at the first failing call. The created post is deleted before
/// returning, so a successful probe leaves no content behind.
pub async fn probe<R: Rng + ?Sized>(
    endpoint: &ServiceEndpoint,
    username: &str,
    password: &str,
    rng: &mut R,
) -> Result<ProbeReport, ApiError> {
    let mut client = endpoint.connect();
    client.authenticate(username, password).await?;
    let me = client.current_identity().await?.clone();
    info!(user = %me.username, id = me.id, "Logged in");

    let users = client.list_users().await?;
    let posts = client.list_content().await?;
    let likes = posts.iter().map(|p| p.likes).sum();
    let dislikes = posts.iter().map(|p| p.dislikes).sum();

    let title = random_text(rng, TITLE_LEN, LOWER_ALNUM);
    let body = random_text(rng, BODY_LEN, PRINTABLE);
    let created = client.create_content(&title, &body).await?;
    client.delete_content(created.id).await?;
    info!(post = created.id, "Probe post created and deleted");

    Ok(ProbeReport {
        users: users.len(),
        posts: posts.len(),
        likes,
        dislikes,
        created,
    })
}
