//! Production Environment implementation using tokio timers and the OS RNG.

use std::time::Duration;

use murmur_core::env::Environment;

/// Production environment.
///
/// Uses `tokio::time::sleep()` for reconnect timers and getrandom for
/// reconnect jitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send + 'static {
        tokio::time::sleep(duration)
    }

    /// Jitter only spreads reconnects out; if the OS RNG is unavailable the
    /// buffer is zeroed, which yields the undithered delay.
    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(e) = getrandom::fill(buffer) {
            tracing::warn!(error = %e, "OS RNG unavailable, reconnect jitter disabled");
            buffer.fill(0);
        }
    }
}
