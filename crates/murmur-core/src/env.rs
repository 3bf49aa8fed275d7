//! Environment abstraction for deterministic testing.
//!
//! Decouples state machines from system resources (timers, randomness). The
//! only consumer of randomness is reconnect jitter; tests supply a fixed
//! source so retry delays are reproducible.

use std::{future::Future, time::Duration};

/// Abstract environment providing randomness and async sleep.
///
/// `sleep()` futures own everything they need, so a driver can store them
/// as reconnect timers.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; state machines never do.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send + 'static;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a random fraction in `[0, 1]`.
    fn random_unit(&self) -> f64 {
        self.random_u64() as f64 / u64::MAX as f64
    }
}
