//! Content campaign: a random number of posts per actor, created concurrently.

use crate::pool::{PoolError, WorkerPool};
use crate::text::{random_text, BODY_LEN, LOWER_ALNUM, PRINTABLE, TITLE_LEN};
use loadbot_client::ServiceClient;
use loadbot_types::{Actor, ContentItem};
use rand::Rng;
use std::sync::Arc;
use tracing::info;

/// Number of posts for one actor, uniform over `1..=max_posts`.
///
/// Zero when `max_posts <= 0`.
pub fn draw_post_count<R: Rng + ?Sized>(max_posts: i64, rng: &mut R) -> usize {
    if max_posts <= 0 {
        return 0;
    }
    rng.gen_range(1..=max_posts) as usize
}

/// Create a random number of posts for `actor` on the pool.
///
/// Every invocation shares the actor's client. A rejected post (a duplicate
/// title, say) is logged and the rest go ahead.
pub async fn create_content_batch<R: Rng + ?Sized>(
    pool: &WorkerPool,
    actor: &Actor,
    client: &Arc<ServiceClient>,
    max_posts: i64,
    rng: &mut R,
) -> Result<Vec<ContentItem>, PoolError> {
    let count = draw_post_count(max_posts, rng);
    if count == 0 {
        return Ok(Vec::new());
    }

    let items = pool
        .run_n("create_content", count, |_| {
            let title = random_text(rng, TITLE_LEN, LOWER_ALNUM);
            let body = random_text(rng, BODY_LEN, PRINTABLE);
            let client = Arc::clone(client);
            async move { client.create_content(&title, &body).await }
        })
        .await?;

    info!(
        actor = %actor,
        requested = count,
        created = items.len(),
        "Content campaign finished"
    );
    Ok(items)
}
