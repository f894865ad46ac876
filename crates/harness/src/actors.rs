//! Actor creation: registration followed by token verification.

use crate::pool::{PoolError, WorkerPool};
use crate::text::random_credential;
use loadbot_client::{ApiError, ServiceClient, ServiceEndpoint};
use loadbot_types::Actor;
use rand::Rng;
use tracing::{debug, info};

/// Credentials for a user that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Credentials {
    /// Random username, password and `{random}@{random}.com` email.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let username = random_credential(rng);
        let password = random_credential(rng);
        let email = format!("{}@{}.com", random_credential(rng), random_credential(rng));
        Self {
            username,
            password,
            email,
        }
    }
}

/// Register a user and authenticate a fresh client with the issued token.
///
/// A verification failure leaves the client without a token; the error is
/// returned either way and the client is dropped with it.
pub async fn create_actor(
    endpoint: ServiceEndpoint,
    credentials: Credentials,
) -> Result<(Actor, ServiceClient), ApiError> {
    let mut client = endpoint.connect();
    let actor = client
        .register(
            &credentials.username,
            &credentials.password,
            &credentials.email,
        )
        .await?;
    client.authenticate_with_token(&actor.token).await?;

    debug!(actor = %actor, "Actor ready");
    Ok((actor, client))
}

/// Create up to `count` actors on the pool.
///
/// Credentials are drawn from `rng` in submission order; the returned pairs
/// are in completion order. Failed registrations are logged and skipped.
pub async fn create_actors<R: Rng + ?Sized>(
    pool: &WorkerPool,
    endpoint: &ServiceEndpoint,
    count: usize,
    rng: &mut R,
) -> Result<Vec<(Actor, ServiceClient)>, PoolError> {
    info!(count, "Creating actors");
    let actors = pool
        .run_n("create_actor", count, |_| {
            create_actor(endpoint.clone(), Credentials::generate(rng))
        })
        .await?;
    info!(requested = count, created = actors.len(), "Actors created");
    Ok(actors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadbot_test_helpers::MockApi;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_generated_credentials_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let creds = Credentials::generate(&mut rng);
        assert_eq!(creds.username.len(), 8);
        assert_eq!(creds.password.len(), 8);

        let (local, domain) = creds.email.split_once('@').unwrap();
        assert_eq!(local.len(), 8);
        assert!(domain.ends_with(".com"));
        assert_eq!(domain.len(), 8 + ".com".len());
    }

    #[tokio::test]
    async fn test_create_actor_authenticates_client() {
        let api = MockApi::start().await;
        let endpoint = ServiceEndpoint::new(api.base_url(), false).unwrap();
        let creds = Credentials::generate(&mut ChaCha8Rng::seed_from_u64(1));

        let (actor, client) = create_actor(endpoint, creds.clone()).await.unwrap();
        assert_eq!(actor.username, creds.username);
        assert_eq!(actor.email, creds.email);
        assert_eq!(client.token(), Some(actor.token.as_str()));
        assert_eq!(api.requests("POST auth/registration"), 1);
        assert_eq!(api.requests("POST auth/verify"), 1);
    }

    #[tokio::test]
    async fn test_create_actor_fails_on_rejected_token() {
        let api = MockApi::start().await;
        api.reject_token_verification(true);
        let endpoint = ServiceEndpoint::new(api.base_url(), false).unwrap();
        let creds = Credentials::generate(&mut ChaCha8Rng::seed_from_u64(1));

        let err = create_actor(endpoint, creds).await.unwrap_err();
        assert!(matches!(err, ApiError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_create_actors_distinct_tokens() {
        let api = MockApi::start().await;
        let endpoint = ServiceEndpoint::new(api.base_url(), false).unwrap();
        let pool = WorkerPool::new(4);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let actors = create_actors(&pool, &endpoint, 4, &mut rng).await.unwrap();
        assert_eq!(actors.len(), 4);

        let tokens: HashSet<&str> = actors.iter().map(|(a, _)| a.token.as_str()).collect();
        assert_eq!(tokens.len(), 4);
        assert!(tokens.iter().all(|t| !t.is_empty()));
        for (actor, client) in &actors {
            assert_eq!(client.token(), Some(actor.token.as_str()));
        }
    }

    #[tokio::test]
    async fn test_failed_registrations_are_skipped() {
        let api = MockApi::start().await;
        api.fail_next_registrations(2);
        let endpoint = ServiceEndpoint::new(api.base_url(), false).unwrap();
        let pool = WorkerPool::new(5);

        let actors = create_actors(&pool, &endpoint, 5, &mut ChaCha8Rng::seed_from_u64(5))
            .await
            .unwrap();
        assert_eq!(actors.len(), 3);
        assert_eq!(api.user_count(), 3);
        assert_eq!(api.requests("POST auth/registration"), 5);
        // Rejected registrations never reach verification
        assert_eq!(api.requests("POST auth/verify"), 3);
    }
}
