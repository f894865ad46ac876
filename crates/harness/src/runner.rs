//! Run coordinator.
//!
//! A run moves through its stages strictly in order, each stage fully drained
//! before the next one is submitted:
//!
//! ```text
//! Idle ──► ActorsCreated ──► ContentSeeded ──► VotesCast
//!   │           (optional)        (optional)
//!   └─► Failed  (no actor could be created)
//! ```
//!
//! All stages share one [`WorkerPool`] whose width is the number of users.
//! Failures inside a stage only shrink the counts in the report; the sole
//! terminal failure is ending the actor stage with nobody to act.

use crate::actors::create_actors;
use crate::config::HarnessConfig;
use crate::content::create_content_batch;
use crate::pool::WorkerPool;
use crate::report::{ActorReport, RunReport, RunStage};
use crate::voting::vote_for_actor;
use loadbot_client::{ApiError, ServiceClient, ServiceEndpoint};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that prevent a harness from being built.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Missing api_url")]
    MissingApiUrl,

    #[error("Failed to set up API client: {0}")]
    Client(#[from] ApiError),
}

/// Drives one configured run against the API.
pub struct Harness {
    config: HarnessConfig,
    endpoint: ServiceEndpoint,
    rng: ChaCha8Rng,
}

impl Harness {
    /// Build a harness. Makes no network calls.
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        if config.api_url.trim().is_empty() {
            return Err(HarnessError::MissingApiUrl);
        }

        let endpoint = ServiceEndpoint::new(config.api_url.clone(), config.accept_invalid_certs)?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            config,
            endpoint,
            rng,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// Run every configured stage and report what happened.
    pub async fn run(&mut self) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(self.config.number_of_users);

        info!(
            api_url = %self.config.api_url,
            number_of_users = self.config.number_of_users,
            max_posts_per_user = self.config.max_posts_per_user,
            max_likes_per_user = self.config.max_likes_per_user,
            "Starting run"
        );

        if self.config.number_of_users <= 0 {
            warn!("Amount of users not specified, nothing to do");
            return report;
        }

        let users = self.config.number_of_users as usize;
        let pool = WorkerPool::new(users);

        let created = create_actors(&pool, &self.endpoint, users, &mut self.rng)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Actor stage could not be scheduled");
                Vec::new()
            });

        if created.is_empty() {
            error!("No actors were created");
            report.stage = RunStage::Failed;
            self.finish(&mut report, started);
            return report;
        }

        let mut roster: Vec<(ActorReport, Arc<ServiceClient>)> = created
            .into_iter()
            .map(|(actor, client)| (ActorReport::new(actor), Arc::new(client)))
            .collect();
        self.advance(&mut report, RunStage::ActorsCreated);

        if self.config.max_posts_per_user > 0 {
            for (entry, client) in roster.iter_mut() {
                match create_content_batch(
                    &pool,
                    &entry.actor,
                    client,
                    self.config.max_posts_per_user,
                    &mut self.rng,
                )
                .await
                {
                    Ok(items) => entry.content = items,
                    Err(e) => warn!(actor = %entry.actor, error = %e, "Content campaign not scheduled"),
                }
            }
            self.advance(&mut report, RunStage::ContentSeeded);
        }

        if self.config.max_likes_per_user > 0 {
            for (entry, client) in roster.iter_mut() {
                match vote_for_actor(
                    &pool,
                    &entry.actor,
                    client,
                    self.config.max_likes_per_user,
                    &mut self.rng,
                )
                .await
                {
                    Ok(ballots) => entry.ballots = ballots,
                    Err(e) => warn!(actor = %entry.actor, error = %e, "Voting campaign not scheduled"),
                }
            }
            self.advance(&mut report, RunStage::VotesCast);
        }

        report.actors = roster.into_iter().map(|(entry, _)| entry).collect();
        self.finish(&mut report, started);
        report
    }

    fn advance(&self, report: &mut RunReport, stage: RunStage) {
        report.stage = stage;
        info!(%stage, "Stage complete");
    }

    fn finish(&self, report: &mut RunReport, started: Instant) {
        report.requests = self.endpoint.metrics().snapshot();
        report.elapsed = started.elapsed();
        info!(
            stage = %report.stage,
            actors = report.actors_created(),
            posts = report.content_created(),
            votes = report.votes_cast(),
            elapsed = ?report.elapsed,
            "Run finished"
        );
    }
}
