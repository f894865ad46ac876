//! Full runs of the harness against the in-memory API.

use loadbot::{Harness, HarnessConfig, RunStage};
use loadbot_test_helpers::MockApi;

fn config(api: &MockApi, users: i64, posts: i64, likes: i64, seed: u64) -> HarnessConfig {
    HarnessConfig::new(api.base_url())
        .with_number_of_users(users)
        .with_max_posts_per_user(posts)
        .with_max_likes_per_user(likes)
        .with_seed(seed)
        .with_accept_invalid_certs(false)
}

#[tokio::test]
async fn test_content_only_run() {
    let api = MockApi::start().await;
    let mut harness = Harness::new(config(&api, 3, 2, 0, 1)).unwrap();

    let report = harness.run().await;

    assert_eq!(report.stage, RunStage::ContentSeeded);
    assert_eq!(report.actors_created(), 3);
    assert_eq!(api.user_count(), 3);
    assert!((3..=6).contains(&report.content_created()));
    assert_eq!(api.post_count(), report.content_created());
    assert_eq!(report.votes_cast(), 0);
    assert_eq!(api.vote_count(), 0);

    for entry in &report.actors {
        assert!((1..=2).contains(&entry.content.len()));
        assert!(entry
            .content
            .iter()
            .all(|item| item.author_id == entry.actor.user_id));
    }
}

#[tokio::test]
async fn test_full_run_respects_vote_budget() {
    let api = MockApi::start().await;
    let mut harness = Harness::new(config(&api, 4, 3, 5, 2)).unwrap();

    let report = harness.run().await;

    assert_eq!(report.stage, RunStage::VotesCast);
    assert_eq!(report.actors_created(), 4);
    assert_eq!(api.vote_count(), report.votes_cast());
    assert_eq!(report.likes() + report.dislikes(), report.votes_cast());

    // Each actor lists posts once and attempts four votes
    assert_eq!(api.requests("GET posts"), 4);
    assert_eq!(
        api.requests("POST posts/like") + api.requests("POST posts/dislike"),
        16
    );
    for entry in &report.actors {
        assert!(entry.ballots.len() <= 4);
        let recorded = api
            .votes_by_author()
            .get(&entry.actor.user_id)
            .copied()
            .unwrap_or(0);
        assert_eq!(recorded, entry.ballots.len());
    }
}

#[tokio::test]
async fn test_identity_fetched_once_per_actor() {
    let api = MockApi::start().await;
    let mut harness = Harness::new(config(&api, 3, 4, 0, 3)).unwrap();

    let report = harness.run().await;

    assert_eq!(report.stage, RunStage::ContentSeeded);
    assert_eq!(api.requests("GET users/me"), 3);
}

#[tokio::test]
async fn test_zero_users_is_a_no_op() {
    let api = MockApi::start().await;
    let mut harness = Harness::new(config(&api, 0, 5, 5, 4)).unwrap();

    let report = harness.run().await;

    assert_eq!(report.stage, RunStage::Idle);
    assert_eq!(api.total_requests(), 0);
}

#[tokio::test]
async fn test_run_fails_when_no_user_registers() {
    let api = MockApi::start().await;
    api.fail_next_registrations(3);
    let mut harness = Harness::new(config(&api, 3, 5, 5, 5)).unwrap();

    let report = harness.run().await;

    assert_eq!(report.stage, RunStage::Failed);
    assert!(report.is_failed());
    assert_eq!(api.requests("POST posts"), 0);
    assert_eq!(api.requests("GET posts"), 0);
}

#[tokio::test]
async fn test_partial_registration_failure_continues() {
    let api = MockApi::start().await;
    api.fail_next_registrations(2);
    let mut harness = Harness::new(config(&api, 5, 1, 0, 6)).unwrap();

    let report = harness.run().await;

    assert_eq!(report.stage, RunStage::ContentSeeded);
    assert_eq!(report.actors_created(), 3);
    // With a bound of one, every actor creates exactly one post
    assert_eq!(report.content_created(), 3);
}

#[tokio::test]
async fn test_same_seed_same_shape() {
    let first_api = MockApi::start().await;
    let first = Harness::new(config(&first_api, 1, 6, 0, 77))
        .unwrap()
        .run()
        .await;

    let second_api = MockApi::start().await;
    let second = Harness::new(config(&second_api, 1, 6, 0, 77))
        .unwrap()
        .run()
        .await;

    assert_eq!(first.content_created(), second.content_created());
    assert_eq!(
        first.actors[0].actor.username,
        second.actors[0].actor.username
    );
}
