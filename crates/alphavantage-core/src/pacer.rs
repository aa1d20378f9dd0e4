use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::Error;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token-bucket pacer shared by every request a client sends.
///
/// Permits refill continuously at `n` per minute with a bucket of one, so no
/// 60-second window ever sees more than `n + 1` requests. Waiters are served
/// in arrival order. A pacer built with `0` never blocks.
#[derive(Clone)]
pub struct Pacer {
    inner: Option<Arc<PacerInner>>,
    per_minute: u32,
}

struct PacerInner {
    limiter: DirectRateLimiter,
    queue: Mutex<()>,
}

impl Pacer {
    pub fn per_minute(per_minute: u32) -> Self {
        let Some(limit) = NonZeroU32::new(per_minute) else {
            return Self::unlimited();
        };
        Self {
            inner: Some(Arc::new(PacerInner {
                limiter: RateLimiter::direct(quota_per_minute(limit)),
                queue: Mutex::new(()),
            })),
            per_minute,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            inner: None,
            per_minute: 0,
        }
    }

    /// Configured permits per minute; `0` means unlimited.
    pub const fn permits_per_minute(&self) -> u32 {
        self.per_minute
    }

    pub const fn is_limited(&self) -> bool {
        self.inner.is_some()
    }

    /// Waits for one permit.
    ///
    /// Returns [`Error::Cancelled`] without consuming a permit when `token`
    /// fires first.
    pub async fn wait(&self, token: &CancellationToken) -> Result<(), Error> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let Some(inner) = &self.inner else {
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("pacer wait cancelled");
                Err(Error::Cancelled)
            }
            _ = async {
                let _turn = inner.queue.lock().await;
                inner.limiter.until_ready().await;
            } => {
                trace!(per_minute = self.per_minute, "pacer permit granted");
                Ok(())
            }
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("per_minute", &self.per_minute)
            .finish()
    }
}

fn quota_per_minute(limit: NonZeroU32) -> Quota {
    let period = Duration::from_secs(60) / limit.get();
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_minute(limit))
        .allow_burst(NonZeroU32::MIN)
}
