//! Bootstrap coordinator
//!
//! Owns the lifecycle of the process-wide connection pool:
//!
//! ```text
//! Uninitialized -> Attempting(1) -> ... -> Attempting(n) -> Ready -> Closed
//!                                                       \-> Failed
//! ```
//!
//! A pool is published only after it answered a liveness query and the
//! required tables exist. Concurrent `acquire` calls share one in-flight run
//! and all receive the same pool. The database driver, DNS, and the clock are
//! injected so the state machine can be driven without a database.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, OnceCell};

use crate::descriptor::ConnectionDescriptor;
use crate::resolver::{ConnectionResolver, HostLookup, SystemLookup};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff schedule for bootstrap attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Effective attempt budget (at least one).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after the `attempt`-th failure (1-based): `initial * 2^(attempt-1)`,
    /// capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Every wait of a run in which all attempts fail. There is no wait after
    /// the final attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.attempts()).map(|n| self.delay_after(n)).collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY)
    }
}

/// Source of backoff waits.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time clock backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Outcome of the schema step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Tables that were missing and have been created.
    pub created: Vec<String>,
    /// Tables that already existed.
    pub present: Vec<String>,
}

/// Database driver seam used by the coordinator.
#[async_trait]
pub trait Connector: Send + Sync {
    type Pool: Clone + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a pool against `target` with bounded timeouts.
    async fn connect(&self, target: &ConnectionDescriptor) -> Result<Self::Pool, Self::Error>;

    /// Trivial liveness query.
    async fn ping(&self, pool: &Self::Pool) -> Result<(), Self::Error>;

    /// Check each required table and create the missing ones. Creation must
    /// tolerate a table that appeared since the check.
    async fn ensure_schema(&self, pool: &Self::Pool) -> Result<SchemaReport, Self::Error>;

    /// Drop a half-open pool after a failed attempt.
    async fn discard(&self, pool: Self::Pool);

    /// Close the published pool at shutdown.
    async fn close(&self, pool: &Self::Pool);

    /// Whether another attempt could succeed after `error`.
    fn is_retryable(&self, _error: &Self::Error) -> bool {
        true
    }
}

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Attempting(u32),
    Ready,
    Failed { attempts: u32 },
    Closed,
}

impl BootstrapState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Closed)
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError<E>
where
    E: std::error::Error + 'static,
{
    /// Every attempt failed; carries the last underlying error.
    #[error("database bootstrap failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// An attempt failed with an error that retrying cannot fix.
    #[error("database bootstrap aborted on attempt {attempts}: {source}")]
    Fatal {
        attempts: u32,
        #[source]
        source: E,
    },

    /// A previous run already failed; reported to later callers.
    #[error("database bootstrap already failed after {attempts} attempt(s)")]
    Failed { attempts: u32 },

    #[error("database pool has been closed")]
    Closed,
}

impl<E> BootstrapError<E>
where
    E: std::error::Error + 'static,
{
    /// Attempts made before giving up, if any were made.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Fatal { attempts, .. }
            | Self::Failed { attempts } => Some(*attempts),
            Self::Closed => None,
        }
    }

    /// The underlying driver error, when this caller observed it.
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Exhausted { source, .. } | Self::Fatal { source, .. } => Some(source),
            Self::Failed { .. } | Self::Closed => None,
        }
    }
}

/// Single-initialization owner of the shared pool.
pub struct Bootstrap<C, L = SystemLookup, K = TokioClock>
where
    C: Connector,
{
    connector: C,
    resolver: ConnectionResolver<L>,
    clock: K,
    policy: RetryPolicy,
    descriptor: ConnectionDescriptor,
    pool: OnceCell<C::Pool>,
    state: watch::Sender<BootstrapState>,
}

impl<C: Connector> Bootstrap<C> {
    /// Coordinator with the system resolver, tokio clock, and default policy.
    pub fn new(connector: C, descriptor: ConnectionDescriptor) -> Self {
        Self {
            connector,
            resolver: ConnectionResolver::system(),
            clock: TokioClock,
            policy: RetryPolicy::default(),
            descriptor,
            pool: OnceCell::new(),
            state: watch::Sender::new(BootstrapState::Uninitialized),
        }
    }
}

impl<C, L, K> Bootstrap<C, L, K>
where
    C: Connector,
{
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_resolver<L2>(self, resolver: ConnectionResolver<L2>) -> Bootstrap<C, L2, K> {
        Bootstrap {
            connector: self.connector,
            resolver,
            clock: self.clock,
            policy: self.policy,
            descriptor: self.descriptor,
            pool: self.pool,
            state: self.state,
        }
    }

    pub fn with_clock<K2>(self, clock: K2) -> Bootstrap<C, L, K2> {
        Bootstrap {
            connector: self.connector,
            resolver: self.resolver,
            clock,
            policy: self.policy,
            descriptor: self.descriptor,
            pool: self.pool,
            state: self.state,
        }
    }

    pub fn state(&self) -> BootstrapState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<BootstrapState> {
        self.state.subscribe()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The configured (unresolved) target.
    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// The published pool, without triggering a bootstrap.
    pub fn get(&self) -> Option<&C::Pool> {
        match self.state() {
            BootstrapState::Closed => None,
            _ => self.pool.get(),
        }
    }

    fn transition(&self, next: BootstrapState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(?previous, ?next, "bootstrap state change");
    }
}

impl<C, L, K> Bootstrap<C, L, K>
where
    C: Connector,
    L: HostLookup,
    K: Clock,
{
    /// Return the shared pool, bootstrapping it on first use.
    pub async fn acquire(&self) -> Result<C::Pool, BootstrapError<C::Error>> {
        match self.state() {
            BootstrapState::Closed => return Err(BootstrapError::Closed),
            BootstrapState::Failed { attempts } => return Err(BootstrapError::Failed { attempts }),
            _ => {}
        }

        let pool = self.pool.get_or_try_init(|| self.run()).await?;
        Ok(pool.clone())
    }

    /// Close the published pool. Returns `false` when there was nothing to close.
    pub async fn close(&self) -> bool {
        let Some(pool) = self.pool.get() else {
            return false;
        };
        if self.state.send_replace(BootstrapState::Closed) == BootstrapState::Closed {
            return false;
        }

        self.connector.close(pool).await;
        tracing::info!(db = %self.descriptor, "database pool closed");
        true
    }

    async fn run(&self) -> Result<C::Pool, BootstrapError<C::Error>> {
        // A waiter that queued behind a failed run must not start a new one.
        match self.state() {
            BootstrapState::Failed { attempts } => return Err(BootstrapError::Failed { attempts }),
            BootstrapState::Closed => return Err(BootstrapError::Closed),
            _ => {}
        }

        let max_attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            self.transition(BootstrapState::Attempting(attempt));
            tracing::info!(attempt, max_attempts, db = %self.descriptor, "connecting to database");

            let error = match self.attempt().await {
                Ok(pool) => {
                    self.transition(BootstrapState::Ready);
                    tracing::info!(attempt, "database ready");
                    return Ok(pool);
                }
                Err(error) => error,
            };

            if !self.connector.is_retryable(&error) {
                self.transition(BootstrapState::Failed { attempts: attempt });
                tracing::error!(attempt, error = %error, "database bootstrap failed with a non-retryable error");
                return Err(BootstrapError::Fatal {
                    attempts: attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                self.transition(BootstrapState::Failed { attempts: attempt });
                tracing::error!(attempt, error = %error, "database bootstrap retry budget exhausted");
                return Err(BootstrapError::Exhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "database bootstrap attempt failed, retrying"
            );
            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self) -> Result<C::Pool, C::Error> {
        let target = self.resolver.resolve(&self.descriptor).await;
        let pool = self.connector.connect(&target).await?;

        let validated = async {
            self.connector.ping(&pool).await?;
            self.connector.ensure_schema(&pool).await
        }
        .await;

        match validated {
            Ok(report) => {
                if report.created.is_empty() {
                    tracing::info!(tables = ?report.present, "schema already present");
                } else {
                    tracing::info!(created = ?report.created, "created missing tables");
                }
                Ok(pool)
            }
            Err(e) => {
                self.connector.discard(pool).await;
                Err(e)
            }
        }
    }
}
