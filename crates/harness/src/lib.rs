//! Loadbot
//!
//! Drives a content-and-voting REST API with simulated users, to exercise it
//! under concurrent load and to seed it with realistic data.
//!
//! # Architecture
//!
//! A run is a fixed pipeline of stages, each fanned out over one bounded
//! [`WorkerPool`]:
//!
//! - **Actors**: register users with random credentials and authenticate a
//!   dedicated client per user
//! - **Content**: every actor creates a random number of posts
//! - **Voting**: every actor likes or dislikes random posts
//!
//! Individual request failures are logged and dropped; the [`RunReport`]
//! reflects only what the API accepted.
//!
//! # Example
//!
//! ```ignore
//! use loadbot::{Harness, HarnessConfig};
//!
//! let config = HarnessConfig::new("http://127.0.0.1:8000/api/v1")
//!     .with_number_of_users(10)
//!     .with_max_posts_per_user(5)
//!     .with_max_likes_per_user(10)
//!     .with_seed(42);
//!
//! let mut harness = Harness::new(config)?;
//! let report = harness.run().await;
//! report.print();
//! ```

pub mod actors;
pub mod config;
pub mod content;
pub mod pool;
pub mod probe;
pub mod report;
pub mod runner;
pub mod text;
pub mod voting;

pub use actors::{create_actor, create_actors, Credentials};
pub use config::{ConfigError, HarnessConfig};
pub use content::create_content_batch;
pub use pool::{PoolError, WorkerPool};
pub use probe::{probe, ProbeReport};
pub use report::{ActorReport, RunReport, RunStage};
pub use runner::{Harness, HarnessError};
pub use voting::{cast_votes, vote_for_actor, Ballot};
