//! Graph abstraction over a knowledge base, with bounded-cost closures.
//!
//! Axioms and expression structure are turned into an edge-labeled graph
//! whose edges carry *quantified relation chains* (ordered property-qualified
//! steps, not just is-a). Reachability queries compose those chains and
//! simplify them against property-hierarchy and transitivity facts, so a
//! two-hop `part_of` path over a transitive property comes back as one
//! reduced step. The engine is deliberately incomplete: it never reports an
//! entailment that does not hold, but may miss ones outside its reduction
//! rules, and it never calls a reasoner at query time.
//!
//! Pipeline: [`seed::SeedIndex`] derives the direct edge set from axioms and
//! node structure; [`hierarchy::PropertyHierarchyIndex`] is primed once from
//! the axiom store and the reasoner oracle; [`compose`] reduces adjacent
//! relation steps; [`traverse`] runs the work-list closure; [`translate`]
//! folds a closure edge back into a class expression. [`engine::ClosureEngine`]
//! ties these together behind a cached query surface.

pub mod compose;
pub mod engine;
pub mod hierarchy;
pub mod relation;
pub mod seed;
pub mod translate;
pub mod traverse;

use thiserror::Error;

pub use compose::{reduce, reduce_list, TieBreak};
pub use engine::{ClosureEngine, EngineConfig, DEFAULT_WORKLIST_LIMIT};
pub use hierarchy::PropertyHierarchyIndex;
pub use relation::{Edge, QuantifiedRelation};
pub use seed::SeedIndex;
pub use translate::edge_to_target_expression;
pub use traverse::Closure;

pub use ontograph_kb::OracleError;

/// Failures of the graph layer. All surfaced to the immediate caller; none
/// are retried internally.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The external reasoner failed while priming the property hierarchy
    /// index. A partial index would silently under-reduce relation chains,
    /// so the whole build fails.
    #[error("reasoner oracle failed: {0}")]
    Oracle(#[from] OracleError),

    /// A query hit a snapshot built before the latest axiom mutation.
    /// Serving the stale answer would be a correctness bug, not a transient
    /// fault; the caller must run `invalidate()` and retry itself.
    #[error(
        "snapshot built at revision {built_at} is stale (store now at revision {current}); \
         call invalidate() after mutating axioms"
    )]
    IndexStale { built_at: u64, current: u64 },

    /// The traversal outgrew the configured bound. The closure is abandoned
    /// whole; callers treat this as "no closure available" and fall back to
    /// the external reasoner.
    #[error("closure of {node} aborted: more than {limit} node expansions")]
    ClosureAborted { node: String, limit: usize },

    /// A caller-supplied edge or expression violates a structural
    /// precondition, e.g. a relation step with no expression form.
    #[error("{message}")]
    StructuralViolation { message: String },
}
