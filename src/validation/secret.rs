//! `httpSecret` stabilisation
//!
//! The secret is generated once, when the spec leaves it empty, and is
//! never replaced afterwards.

use crate::domain::advisory::{Advisory, AdvisoryKind, Normalized};
use crate::domain::ports::SecretGenerator;
use crate::validation::validator::CanonicalConfig;
use tracing::info;

/// Return `config` with a non-empty `http_secret`.
///
/// An existing secret is kept untouched. A generated one is reported with a
/// `DefaultApplied` advisory so the caller knows to persist it.
pub fn ensure_http_secret(
    config: &CanonicalConfig,
    generator: &dyn SecretGenerator,
) -> Normalized<CanonicalConfig> {
    if !config.http_secret.is_empty() {
        return Normalized::new(config.clone());
    }

    let mut config = config.clone();
    config.http_secret = generator.generate();
    info!("Generated registry httpSecret");
    Normalized::with_advisories(
        config,
        vec![Advisory::new(
            AdvisoryKind::DefaultApplied,
            "spec.httpSecret",
            "generated a new secret",
        )],
    )
}
