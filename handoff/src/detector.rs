//! Operator arrival detection.
//!
//! Joining identities are matched against the reserved operator namespace.
//! The match is exact-prefix, never fuzzy: a false negative would leave the
//! automated session running forever after the human already joined.

/// Reserved identity namespace for human operators.
///
/// The credential issuer mints identities as `human-agent-<timestamp>`;
/// matching on the bare namespace also accepts a manually minted
/// `human-agent` identity.
pub const OPERATOR_NAMESPACE: &str = "human-agent";

/// Pure, stateless predicate over joining participant identities.
#[derive(Debug, Clone)]
pub struct OperatorArrivalDetector {
    prefix: String,
}

impl OperatorArrivalDetector {
    /// Detector for the default `human-agent` namespace.
    pub fn new() -> Self {
        Self::with_prefix(OPERATOR_NAMESPACE)
    }

    /// Detector for a custom namespace prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Whether `identity` belongs to the reserved operator namespace.
    pub fn is_operator(&self, identity: &str) -> bool {
        !identity.is_empty() && identity.starts_with(&self.prefix)
    }
}

impl Default for OperatorArrivalDetector {
    fn default() -> Self {
        Self::new()
    }
}
