//! Domain Ports - boundaries to the outside world
//!
//! The configuration model itself is pure; the only external capability it
//! needs is a source of randomness for the registry's `httpSecret`.

use rand::RngCore;

/// Number of random bytes in a generated HTTP secret
pub const HTTP_SECRET_BYTES: usize = 64;

// =============================================================================
// Secret Generation
// =============================================================================

/// Source of new `httpSecret` values
pub trait SecretGenerator: Send + Sync {
    /// Produce a fresh secret
    fn generate(&self) -> String;
}

/// Hex-encoded secret drawn from the thread-local CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecretGenerator;

impl SecretGenerator for RandomSecretGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; HTTP_SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

/// Generator returning a fixed value, for callers that derive the secret
/// elsewhere
#[derive(Debug, Clone)]
pub struct StaticSecretGenerator(pub String);

impl SecretGenerator for StaticSecretGenerator {
    fn generate(&self) -> String {
        self.0.clone()
    }
}
