//! Payment gateway abstraction and the simulated implementation.
//!
//! The platform never talks to a real processor: [`SimulatedGateway`]
//! models the gateway round-trip with a bounded latency and a configured
//! approval probability. A decline is a normal outcome the caller branches
//! on, not an error.

use crate::error::Result;
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a payment authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The charge was approved. Carries the gateway's subscription token.
    Approved { gateway_token: String },
    /// The charge was declined by the gateway.
    Declined,
}

impl AuthorizationOutcome {
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}

/// Trait for payment authorization.
///
/// `authorize` only returns `Err` for infrastructure problems; a declined
/// charge is `Ok(AuthorizationOutcome::Declined)`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, amount: i64, method: &str) -> Result<AuthorizationOutcome>;
}

/// Default approval probability for the simulated gateway.
pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;

/// Simulated payment gateway.
///
/// Approves with a fixed probability after a simulated network delay.
/// The RNG is seeded per call: pass a seed via [`with_seed`](Self::with_seed)
/// to make outcomes deterministic in tests.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    success_rate: f64,
    latency: Duration,
    seed: Option<u64>,
}

impl SimulatedGateway {
    /// Create a gateway with the default 0.8 success rate and 250ms latency.
    #[must_use]
    pub fn new() -> Self {
        Self {
            success_rate: DEFAULT_SUCCESS_RATE,
            latency: Duration::from_millis(250),
            seed: None,
        }
    }

    /// Override the approval probability (clamped to `0.0..=1.0`).
    #[must_use]
    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Override the simulated round-trip latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Seed the per-call RNG for deterministic outcomes.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn draw(&self) -> f64 {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        rng.gen::<f64>()
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(&self, amount: i64, method: &str) -> Result<AuthorizationOutcome> {
        tracing::debug!(amount, method, "Processing simulated payment");

        // Model the gateway round-trip
        tokio::time::sleep(self.latency).await;

        if self.draw() < self.success_rate {
            Ok(AuthorizationOutcome::Approved {
                gateway_token: format!("sim_{}", Uuid::new_v4()),
            })
        } else {
            tracing::info!(amount, method, "Simulated gateway declined charge");
            Ok(AuthorizationOutcome::Declined)
        }
    }
}

/// Gateway doubles for tests.
pub mod test {
    use super::*;

    /// Gateway that approves every charge.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysApprove;

    #[async_trait]
    impl PaymentGateway for AlwaysApprove {
        async fn authorize(&self, _amount: i64, _method: &str) -> Result<AuthorizationOutcome> {
            Ok(AuthorizationOutcome::Approved {
                gateway_token: format!("sim_{}", Uuid::new_v4()),
            })
        }
    }

    /// Gateway that declines every charge.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysDecline;

    #[async_trait]
    impl PaymentGateway for AlwaysDecline {
        async fn authorize(&self, _amount: i64, _method: &str) -> Result<AuthorizationOutcome> {
            Ok(AuthorizationOutcome::Declined)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::{AlwaysApprove, AlwaysDecline};
    use super::*;

    #[tokio::test]
    async fn test_seeded_gateway_is_deterministic() {
        let gateway = SimulatedGateway::new()
            .with_latency(Duration::from_millis(1))
            .with_seed(42);

        let first = gateway.authorize(500, "card").await.unwrap();
        let second = gateway.authorize(500, "card").await.unwrap();
        assert_eq!(first.is_approved(), second.is_approved());
    }

    #[tokio::test]
    async fn test_success_rate_one_always_approves() {
        let gateway = SimulatedGateway::new()
            .with_latency(Duration::from_millis(1))
            .with_success_rate(1.0);

        for _ in 0..10 {
            let outcome = gateway.authorize(500, "card").await.unwrap();
            assert!(outcome.is_approved());
        }
    }

    #[tokio::test]
    async fn test_success_rate_zero_always_declines() {
        let gateway = SimulatedGateway::new()
            .with_latency(Duration::from_millis(1))
            .with_success_rate(0.0);

        for _ in 0..10 {
            let outcome = gateway.authorize(500, "card").await.unwrap();
            assert_eq!(outcome, AuthorizationOutcome::Declined);
        }
    }

    #[tokio::test]
    async fn test_decline_is_ok_not_err() {
        let outcome = AlwaysDecline.authorize(500, "card").await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.unwrap(), AuthorizationOutcome::Declined);
    }

    #[tokio::test]
    async fn test_approved_carries_token() {
        let outcome = AlwaysApprove.authorize(500, "card").await.unwrap();
        match outcome {
            AuthorizationOutcome::Approved { gateway_token } => {
                assert!(gateway_token.starts_with("sim_"));
            }
            AuthorizationOutcome::Declined => panic!("expected approval"),
        }
    }
}
