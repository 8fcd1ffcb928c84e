//! Analyses built on closure queries.
//!
//! Everything here is a consumer of [`ontograph_closure::ClosureEngine`]:
//! least-common-subsumer computation ([`lcs`]), self-contained subset
//! extraction ([`subset`]), and rule-driven annotation propagation
//! ([`propagate`]). These double as executable documentation of the closure
//! semantics; none of them reach past the engine's public surface.

pub mod lcs;
pub mod propagate;
pub mod subset;

use thiserror::Error;

pub use lcs::SubsumerAnalysis;
pub use propagate::{propagate, Assignment, PropagationRule};
pub use subset::{axioms_for_subset, signature_closure};

pub use ontograph_closure::EngineError;

/// Failures of the analysis layer.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The underlying closure query failed (stale snapshot, aborted
    /// traversal, oracle failure).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A query node does not meet an analysis precondition, e.g. an
    /// anonymous expression where a named entity is required.
    #[error("{message}")]
    StructuralViolation { message: String },
}

pub(crate) fn require_named(
    kb: &ontograph_kb::KnowledgeBase,
    node: ontograph_kb::NodeId,
    role: &str,
) -> Result<(), AnalysisError> {
    let is_named = kb.node(node).is_some_and(|n| n.is_named());
    if is_named {
        Ok(())
    } else {
        Err(AnalysisError::StructuralViolation {
            message: format!("{role} must be a named entity, got {}", kb.render(node)),
        })
    }
}
