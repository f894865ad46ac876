//! Voting campaign: random likes and dislikes on existing posts.
//!
//! An actor's campaign is one pool task. Inside it the vote attempts run one
//! after another; a rejected vote (the actor already voted on that post, most
//! often) is logged and the loop moves on. Losing authorization ends the
//! campaign early, since no later attempt could succeed.

use crate::pool::{PoolError, WorkerPool};
use loadbot_client::{ApiError, ServiceClient};
use loadbot_types::{Actor, PostRecord, VoteAction, VoteDirection};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A vote and the title of the post it landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub action: VoteAction,
    pub title: String,
}

/// Vote attempts made for a vote budget of `max_likes`.
///
/// One less than the budget: a budget of 1 makes no attempts at all.
pub fn vote_attempts(max_likes: i64) -> usize {
    if max_likes <= 1 {
        0
    } else {
        (max_likes - 1) as usize
    }
}

/// Cast [`vote_attempts`]`(max_likes)` random votes over `content`.
///
/// Each attempt picks a post and a direction uniformly at random. Returns the
/// votes the API accepted.
pub async fn cast_votes<R: Rng + ?Sized>(
    actor: &Actor,
    client: &ServiceClient,
    content: &[PostRecord],
    max_likes: i64,
    rng: &mut R,
) -> Vec<Ballot> {
    if content.is_empty() {
        debug!(actor = %actor, "No content to vote on");
        return Vec::new();
    }

    let attempts = vote_attempts(max_likes);
    let mut ballots = Vec::new();

    for attempt in 1..=attempts {
        let Some(post) = content.choose(rng) else {
            break;
        };
        let direction = if rng.gen_bool(0.5) {
            VoteDirection::Like
        } else {
            VoteDirection::Dislike
        };

        match client.vote(post.id, direction).await {
            Ok(mut action) => {
                action.actor_id.get_or_insert(actor.user_id);
                ballots.push(Ballot {
                    action,
                    title: post.title.clone(),
                });
            }
            Err(e) if e.is_unauthorized() => {
                warn!(actor = %actor, attempt, error = %e, "Voting stopped");
                break;
            }
            Err(e) => warn!(
                actor = %actor,
                post = post.id,
                attempt,
                error = %e,
                "Vote rejected"
            ),
        }
    }

    ballots
}

/// Fetch the current posts once, then cast votes over them.
pub async fn run_vote_campaign(
    actor: Actor,
    client: Arc<ServiceClient>,
    max_likes: i64,
    mut rng: ChaCha8Rng,
) -> Result<Vec<Ballot>, ApiError> {
    let content = client.list_content().await?;
    Ok(cast_votes(&actor, &client, &content, max_likes, &mut rng).await)
}

/// Run one actor's voting campaign as a single pool task.
///
/// A campaign that fails outright (the post listing was rejected) yields no
/// ballots.
pub async fn vote_for_actor<R: Rng + ?Sized>(
    pool: &WorkerPool,
    actor: &Actor,
    client: &Arc<ServiceClient>,
    max_likes: i64,
    rng: &mut R,
) -> Result<Vec<Ballot>, PoolError> {
    let mut campaigns = pool
        .run_n("cast_votes", 1, |_| {
            let campaign_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            run_vote_campaign(actor.clone(), Arc::clone(client), max_likes, campaign_rng)
        })
        .await?;

    let ballots = campaigns.pop().unwrap_or_default();
    info!(
        actor = %actor,
        attempts = vote_attempts(max_likes),
        accepted = ballots.len(),
        "Voting campaign finished"
    );
    Ok(ballots)
}
