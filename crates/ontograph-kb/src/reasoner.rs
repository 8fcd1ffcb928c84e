//! Reasoner oracle seam.
//!
//! The graph layer never reimplements deduction; it primes its property
//! hierarchy index through this trait and can optionally ask for direct
//! superclasses when seeding. Production callers wire a real DL reasoner
//! behind it; [`StructuralReasoner`] is the built-in oracle that answers from
//! declared axioms only, and tests substitute canned stubs.

use thiserror::Error;

use crate::node::NodeId;
use crate::symbol::SymbolId;
use crate::KnowledgeBase;

/// Failure of an external reasoner call. Never retried here; a partial
/// answer would silently weaken relation reduction, so builds that hit one
/// of these fail outright.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("reasoner backend failed: {message}")]
    Backend { message: String },
    #[error("reasoner call timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Black-box reasoning capability.
///
/// Property closures are reflexive-transitive and include the queried
/// property itself. Implementations decide how much inference backs the
/// answers; callers only rely on soundness.
pub trait ReasonerOracle {
    fn super_properties(&self, property: SymbolId) -> Result<Vec<SymbolId>, OracleError>;

    fn sub_properties(&self, property: SymbolId) -> Result<Vec<SymbolId>, OracleError>;

    /// Named superclasses of a named entity. With `direct`, only the nearest
    /// ones; otherwise the transitive set.
    fn super_classes(&self, entity: NodeId, direct: bool) -> Result<Vec<NodeId>, OracleError>;
}

/// Oracle that walks declared axioms, with no deduction beyond transitive
/// reachability. Sound and deliberately incomplete: restrictions are not
/// traversed, equivalences are not folded into superclass answers.
pub struct StructuralReasoner<'kb> {
    kb: &'kb KnowledgeBase,
}

impl<'kb> StructuralReasoner<'kb> {
    pub fn new(kb: &'kb KnowledgeBase) -> Self {
        Self { kb }
    }

    /// Breadth-first reachability over a direct-neighbor function. Visited
    /// guard keeps declared cycles (p ⊑ q, q ⊑ p) terminating.
    fn property_reach(
        &self,
        start: SymbolId,
        neighbors: impl Fn(SymbolId) -> Vec<SymbolId>,
    ) -> Vec<SymbolId> {
        let mut out = vec![start];
        let mut seen = ahash::AHashSet::from_iter([start]);
        let mut cursor = 0;
        while cursor < out.len() {
            let current = out[cursor];
            cursor += 1;
            for next in neighbors(current) {
                if seen.insert(next) {
                    out.push(next);
                }
            }
        }
        out
    }
}

impl ReasonerOracle for StructuralReasoner<'_> {
    fn super_properties(&self, property: SymbolId) -> Result<Vec<SymbolId>, OracleError> {
        let store = self.kb.axioms();
        Ok(self.property_reach(property, |p| store.direct_super_properties(p).to_vec()))
    }

    fn sub_properties(&self, property: SymbolId) -> Result<Vec<SymbolId>, OracleError> {
        let store = self.kb.axioms();
        Ok(self.property_reach(property, |p| store.direct_sub_properties(p).to_vec()))
    }

    fn super_classes(&self, entity: NodeId, direct: bool) -> Result<Vec<NodeId>, OracleError> {
        let named_sups = |node: NodeId| -> Vec<NodeId> {
            self.kb
                .axioms()
                .axioms_from(node)
                .filter_map(|axiom| match axiom {
                    crate::Axiom::SubClassOf { sub, sup } if *sub == node => Some(*sup),
                    _ => None,
                })
                .filter(|sup| self.kb.node(*sup).is_some_and(|n| n.is_named()))
                .collect()
        };

        if direct {
            return Ok(named_sups(entity));
        }

        // Transitive set over named nodes only; the entity itself is not
        // included in its superclass answer.
        let mut out = Vec::new();
        let mut seen = ahash::AHashSet::from_iter([entity]);
        let mut worklist = vec![entity];
        while let Some(node) = worklist.pop() {
            for sup in named_sups(node) {
                if seen.insert(sup) {
                    out.push(sup);
                    worklist.push(sup);
                }
            }
        }
        Ok(out)
    }
}
