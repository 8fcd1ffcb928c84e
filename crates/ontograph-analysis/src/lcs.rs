//! Common and least-common subsumers.
//!
//! Common ancestors are the intersection of two reflexive ancestor bitmaps.
//! The least common subsumers are the non-redundant frontier of that set:
//! every member that is a proper ancestor of another member is dropped.
//! Mutual ancestors (equivalence cycles) subsume each other without either
//! being proper, so both survive, which keeps the reduction well-defined on
//! cyclic knowledge bases.
//!
//! Pair results are memoized per unordered pair. The memo is keyed to the
//! engine's snapshot revision and clears itself when the engine has been
//! rebuilt, so callers never see subsumers from a previous axiom set.

use ahash::AHashMap;
use parking_lot::Mutex;
use roaring::RoaringBitmap;
use std::sync::Arc;
use tracing::trace;

use ontograph_closure::ClosureEngine;
use ontograph_kb::{KnowledgeBase, NodeId};

use crate::{require_named, AnalysisError};

#[derive(Default)]
struct PairMemo {
    revision: u64,
    pairs: AHashMap<(NodeId, NodeId), Arc<Vec<NodeId>>>,
}

/// Subsumer queries with per-pair memoization.
#[derive(Default)]
pub struct SubsumerAnalysis {
    memo: Mutex<PairMemo>,
}

impl SubsumerAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intersection of the reflexive ancestor sets of `a` and `b`, in raw-id
    /// order. Both nodes count among their own ancestors here, so comparable
    /// pairs meet at the upper node rather than coming back empty.
    pub fn common_ancestors(
        &self,
        kb: &KnowledgeBase,
        engine: &ClosureEngine,
        a: NodeId,
        b: NodeId,
    ) -> Result<Vec<NodeId>, AnalysisError> {
        require_named(kb, a, "subsumer query node")?;
        require_named(kb, b, "subsumer query node")?;
        let left = engine.closure_of(kb, a, true)?;
        let right = engine.closure_of(kb, b, true)?;
        let both = left.endpoint_set() & right.endpoint_set();
        Ok(both.iter().map(NodeId::new).collect())
    }

    /// The non-redundant common ancestors: drop every member that is a
    /// proper ancestor of another member.
    pub fn least_common_subsumers(
        &self,
        kb: &KnowledgeBase,
        engine: &ClosureEngine,
        a: NodeId,
        b: NodeId,
    ) -> Result<Arc<Vec<NodeId>>, AnalysisError> {
        require_named(kb, a, "subsumer query node")?;
        require_named(kb, b, "subsumer query node")?;

        let key = if a.raw() <= b.raw() { (a, b) } else { (b, a) };
        {
            let mut memo = self.memo.lock();
            if memo.revision != engine.built_at() {
                memo.pairs.clear();
                memo.revision = engine.built_at();
            }
            if let Some(hit) = memo.pairs.get(&key) {
                return Ok(Arc::clone(hit));
            }
        }

        let candidates = self.common_ancestors(kb, engine, a, b)?;
        let sets: Vec<RoaringBitmap> = candidates
            .iter()
            .map(|&c| engine.ancestor_set(kb, c))
            .collect::<Result<_, _>>()?;

        let mut kept = Vec::new();
        for (i, &candidate) in candidates.iter().enumerate() {
            let redundant = candidates.iter().enumerate().any(|(j, &other)| {
                i != j
                    && sets[j].contains(candidate.raw())
                    && !sets[i].contains(other.raw())
            });
            if !redundant {
                kept.push(candidate);
            }
        }
        trace!(
            a = a.raw(),
            b = b.raw(),
            common = candidates.len(),
            kept = kept.len(),
            "least common subsumers"
        );

        let kept = Arc::new(kept);
        let mut memo = self.memo.lock();
        if memo.revision == engine.built_at() {
            memo.pairs.insert(key, Arc::clone(&kept));
        }
        Ok(kept)
    }

    /// The least common subsumers as one interned expression: `None` when
    /// there are none, the node itself for a singleton, the interned
    /// intersection otherwise.
    pub fn lcs_expression(
        &self,
        kb: &KnowledgeBase,
        engine: &ClosureEngine,
        a: NodeId,
        b: NodeId,
    ) -> Result<Option<NodeId>, AnalysisError> {
        let subsumers = self.least_common_subsumers(kb, engine, a, b)?;
        Ok(match subsumers.as_slice() {
            [] => None,
            [single] => Some(*single),
            many => Some(kb.intersection(many.to_vec())),
        })
    }

    /// Memoized pair count, for cache introspection in tests.
    pub fn memoized_pairs(&self) -> usize {
        self.memo.lock().pairs.len()
    }
}
