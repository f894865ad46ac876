//! Run outcome and its console rendering.

use crate::voting::Ballot;
use loadbot_client::OperationSummary;
use loadbot_types::{Actor, ContentItem, VoteDirection};
use std::fmt;
use std::time::Duration;

/// Stages of a run, in order.
///
/// A report records the last stage the run reached. `Failed` is only reached
/// when no actor could be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Nothing ran, either because the run was aborted by configuration or
    /// because it has not started.
    Idle,
    ActorsCreated,
    ContentSeeded,
    VotesCast,
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::ActorsCreated => "actors-created",
            RunStage::ContentSeeded => "content-seeded",
            RunStage::VotesCast => "votes-cast",
            RunStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What was done on behalf of one actor.
#[derive(Debug, Clone)]
pub struct ActorReport {
    pub actor: Actor,
    pub content: Vec<ContentItem>,
    pub ballots: Vec<Ballot>,
}

impl ActorReport {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            content: Vec::new(),
            ballots: Vec::new(),
        }
    }
}

/// Outcome of a harness run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stage: RunStage,
    pub requested_users: i64,
    /// Created actors, in the order they finished registering.
    pub actors: Vec<ActorReport>,
    /// Per-operation request metrics.
    pub requests: Vec<OperationSummary>,
    pub elapsed: Duration,
}

impl RunReport {
    /// An empty report for a run that has not started.
    pub fn new(requested_users: i64) -> Self {
        Self {
            stage: RunStage::Idle,
            requested_users,
            actors: Vec::new(),
            requests: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.stage == RunStage::Failed
    }

    pub fn actors_created(&self) -> usize {
        self.actors.len()
    }

    pub fn content_created(&self) -> usize {
        self.actors.iter().map(|a| a.content.len()).sum()
    }

    pub fn votes_cast(&self) -> usize {
        self.actors.iter().map(|a| a.ballots.len()).sum()
    }

    pub fn likes(&self) -> usize {
        self.count_votes(VoteDirection::Like)
    }

    pub fn dislikes(&self) -> usize {
        self.count_votes(VoteDirection::Dislike)
    }

    fn count_votes(&self, direction: VoteDirection) -> usize {
        self.actors
            .iter()
            .flat_map(|a| &a.ballots)
            .filter(|b| b.action.direction == direction)
            .count()
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        for entry in &self.actors {
            for (index, item) in entry.content.iter().enumerate() {
                println!(
                    "Created post #{} {} for user {}",
                    index + 1,
                    item.title,
                    entry.actor.username
                );
            }
        }
        for entry in &self.actors {
            for (index, ballot) in entry.ballots.iter().enumerate() {
                let verb = match ballot.action.direction {
                    VoteDirection::Like => "Liked",
                    VoteDirection::Dislike => "Disliked",
                };
                println!("{} post #{} {}", verb, index + 1, ballot.title);
            }
        }

        println!();
        println!("=== Run Report ===");
        println!("Stage:           {}", self.stage);
        println!("Duration:        {:.2?}", self.elapsed);
        println!(
            "Actors:          {} of {} requested",
            self.actors_created(),
            self.requested_users.max(0)
        );
        println!("Posts created:   {}", self.content_created());
        println!(
            "Votes cast:      {} ({} likes, {} dislikes)",
            self.votes_cast(),
            self.likes(),
            self.dislikes()
        );

        if !self.requests.is_empty() {
            println!();
            println!(
                "{:<18} {:>8} {:>8} {:>10} {:>10} {:>10}",
                "operation", "ok", "failed", "p50", "p99", "max"
            );
            for summary in &self.requests {
                println!(
                    "{:<18} {:>8} {:>8} {:>10.1?} {:>10.1?} {:>10.1?}",
                    summary.operation.as_str(),
                    summary.succeeded,
                    summary.failed,
                    summary.p50,
                    summary.p99,
                    summary.max
                );
            }
        }
    }
}
