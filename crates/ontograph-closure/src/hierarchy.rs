//! Precomputed property-hierarchy facts for one knowledge-base snapshot.
//!
//! Built once per snapshot: reflexive-transitive super/sub-property closures
//! (primed through the reasoner oracle), transitivity flags, declared inverse
//! pairs, and property chains (read straight from the axiom store). This is
//! the only place the engine touches the oracle; closure queries afterwards
//! run entirely off this table.
//!
//! Closure members are stored *ordered, most specific first*: the property
//! itself leads, then supers by decreasing specificity (larger super-closure
//! = more specific), identifier text breaking ties. The position-independent
//! form of that ordering is the global rank, which the reduction table's
//! tie-break consumes.

use ahash::{AHashMap, AHashSet};
use std::cmp::Reverse;
use std::collections::VecDeque;
use tracing::debug;

use ontograph_kb::{Axiom, KnowledgeBase, ReasonerOracle, SymbolId};

use crate::EngineError;

#[derive(Debug)]
pub struct PropertyHierarchyIndex {
    /// Reflexive-transitive super-properties, most specific first
    supers: AHashMap<SymbolId, Vec<SymbolId>>,
    /// Reflexive-transitive sub-properties, most specific first
    subs: AHashMap<SymbolId, Vec<SymbolId>>,
    /// Properties declared transitive
    transitive: AHashSet<SymbolId>,
    /// Declared inverse pairs, both orientations
    inverses: AHashSet<(SymbolId, SymbolId)>,
    /// Property chains keyed by their first property
    chains_by_first: AHashMap<SymbolId, Vec<(Vec<SymbolId>, SymbolId)>>,
    /// Global specificity rank; smaller = more specific
    rank: AHashMap<SymbolId, u32>,
    /// Rank by identifier text alone
    lexical_rank: AHashMap<SymbolId, u32>,
}

impl PropertyHierarchyIndex {
    /// Prime the index from the axiom store and the reasoner oracle.
    ///
    /// Any oracle failure fails the whole build: a partially primed index
    /// would silently under-reduce relation chains.
    pub fn build(
        kb: &KnowledgeBase,
        oracle: &dyn ReasonerOracle,
    ) -> Result<Self, EngineError> {
        // Property universe: everything the axioms mention plus every
        // property used inside a restriction node.
        let mut universe = AHashSet::new();
        universe.extend(kb.axioms().properties());
        for id in kb.nodes().ids() {
            if let Some(p) = kb.node(id).and_then(|n| n.restriction_property()) {
                universe.insert(p);
            }
        }

        let sort_key = |p: &SymbolId| (kb.render_symbol(*p), p.raw());
        let mut queue: Vec<SymbolId> = universe.iter().copied().collect();
        queue.sort_by_key(sort_key);

        // Super-closures to a fixpoint: the oracle may know properties the
        // store never mentions, and those still need a rank.
        let mut closures: AHashMap<SymbolId, AHashSet<SymbolId>> = AHashMap::new();
        let mut pending: VecDeque<SymbolId> = queue.iter().copied().collect();
        while let Some(p) = pending.pop_front() {
            if closures.contains_key(&p) {
                continue;
            }
            let mut set: AHashSet<SymbolId> =
                oracle.super_properties(p)?.into_iter().collect();
            set.insert(p);
            let mut discovered: Vec<SymbolId> = set.iter().copied().collect();
            discovered.sort_by_key(sort_key);
            pending.extend(discovered);
            closures.insert(p, set);
        }

        // Global rank: a property with more supers above it is more
        // specific; identifier text keeps equal-depth siblings deterministic.
        let mut ranked: Vec<SymbolId> = closures.keys().copied().collect();
        ranked.sort_by_key(|p| {
            (
                Reverse(closures[p].len()),
                kb.render_symbol(*p),
                p.raw(),
            )
        });
        let rank: AHashMap<SymbolId, u32> = ranked
            .iter()
            .enumerate()
            .map(|(i, p)| (*p, i as u32))
            .collect();

        let mut lexical: Vec<SymbolId> = closures.keys().copied().collect();
        lexical.sort_by_key(sort_key);
        let lexical_rank: AHashMap<SymbolId, u32> = lexical
            .iter()
            .enumerate()
            .map(|(i, p)| (*p, i as u32))
            .collect();

        let member_order = |of: SymbolId, member: &SymbolId| {
            (
                *member != of,
                rank.get(member).copied().unwrap_or(u32::MAX),
                member.raw(),
            )
        };

        let mut supers: AHashMap<SymbolId, Vec<SymbolId>> = AHashMap::new();
        for (p, closure) in &closures {
            let mut members: Vec<SymbolId> = closure.iter().copied().collect();
            members.sort_by_key(|m| member_order(*p, m));
            supers.insert(*p, members);
        }

        let mut subs: AHashMap<SymbolId, Vec<SymbolId>> = AHashMap::new();
        for p in &ranked {
            let mut members: Vec<SymbolId> = oracle.sub_properties(*p)?.into_iter().collect();
            if !members.contains(p) {
                members.push(*p);
            }
            members.sort_by_key(|m| member_order(*p, m));
            members.dedup();
            subs.insert(*p, members);
        }

        let store = kb.axioms();
        let transitive: AHashSet<SymbolId> = ranked
            .iter()
            .copied()
            .filter(|p| store.is_transitive(*p))
            .collect();

        let mut inverses = AHashSet::new();
        let mut chains_by_first: AHashMap<SymbolId, Vec<(Vec<SymbolId>, SymbolId)>> =
            AHashMap::new();
        for axiom in store.iter() {
            match axiom {
                Axiom::InverseProperties(p, q) => {
                    inverses.insert((*p, *q));
                    inverses.insert((*q, *p));
                }
                Axiom::PropertyChain { chain, implies } => {
                    let Some(first) = chain.first() else {
                        continue;
                    };
                    chains_by_first
                        .entry(*first)
                        .or_default()
                        .push((chain.clone(), *implies));
                }
                _ => {}
            }
        }

        debug!(
            properties = ranked.len(),
            transitive = transitive.len(),
            chains = store.property_chains().len(),
            "primed property hierarchy index"
        );

        Ok(Self {
            supers,
            subs,
            transitive,
            inverses,
            chains_by_first,
            rank,
            lexical_rank,
        })
    }

    /// Reflexive-transitive super-properties, most specific first. Empty for
    /// properties unknown to the snapshot.
    pub fn super_properties(&self, property: SymbolId) -> &[SymbolId] {
        self.supers
            .get(&property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Reflexive-transitive sub-properties, most specific first.
    pub fn sub_properties(&self, property: SymbolId) -> &[SymbolId] {
        self.subs.get(&property).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reflexive sub-property test.
    pub fn is_sub_property_of(&self, sub: SymbolId, sup: SymbolId) -> bool {
        sub == sup
            || self
                .supers
                .get(&sub)
                .is_some_and(|members| members.contains(&sup))
    }

    pub fn is_transitive(&self, property: SymbolId) -> bool {
        self.transitive.contains(&property)
    }

    pub fn are_inverse(&self, p: SymbolId, q: SymbolId) -> bool {
        self.inverses.contains(&(p, q))
    }

    /// Chains starting with `first`, as `(full chain, implied property)`.
    pub fn chains_from(&self, first: SymbolId) -> &[(Vec<SymbolId>, SymbolId)] {
        self.chains_by_first
            .get(&first)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Global specificity rank; `u32::MAX` for unknown properties.
    pub fn rank(&self, property: SymbolId) -> u32 {
        self.rank.get(&property).copied().unwrap_or(u32::MAX)
    }

    /// Rank by identifier text; `u32::MAX` for unknown properties.
    pub fn lexical_rank(&self, property: SymbolId) -> u32 {
        self.lexical_rank
            .get(&property)
            .copied()
            .unwrap_or(u32::MAX)
    }

    /// Number of properties the snapshot knows about.
    pub fn property_count(&self) -> usize {
        self.rank.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontograph_kb::{NodeId, OracleError, StructuralReasoner};

    fn kb_with_chain() -> (KnowledgeBase, SymbolId, SymbolId, SymbolId) {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let overlaps = kb.property("overlaps");
        let related = kb.property("related_to");
        kb.assert_axiom(Axiom::SubPropertyOf { sub: part_of, sup: overlaps });
        kb.assert_axiom(Axiom::SubPropertyOf { sub: overlaps, sup: related });
        kb.assert_axiom(Axiom::TransitiveProperty(overlaps));
        (kb, part_of, overlaps, related)
    }

    #[test]
    fn super_closure_is_ordered_most_specific_first() {
        let (kb, part_of, overlaps, related) = kb_with_chain();
        let oracle = StructuralReasoner::new(&kb);
        let index = PropertyHierarchyIndex::build(&kb, &oracle).unwrap();

        assert_eq!(index.super_properties(part_of), &[part_of, overlaps, related]);
        assert!(index.rank(part_of) < index.rank(overlaps));
        assert!(index.rank(overlaps) < index.rank(related));
    }

    #[test]
    fn incomparable_supers_order_by_text() {
        let mut kb = KnowledgeBase::new();
        let p = kb.property("p");
        let zeta = kb.property("zeta");
        let alpha = kb.property("alpha");
        kb.assert_axiom(Axiom::SubPropertyOf { sub: p, sup: zeta });
        kb.assert_axiom(Axiom::SubPropertyOf { sub: p, sup: alpha });

        let oracle = StructuralReasoner::new(&kb);
        let index = PropertyHierarchyIndex::build(&kb, &oracle).unwrap();
        assert_eq!(index.super_properties(p), &[p, alpha, zeta]);
        assert!(index.lexical_rank(alpha) < index.lexical_rank(zeta));
    }

    #[test]
    fn sub_property_tests_and_flags() {
        let (kb, part_of, overlaps, related) = kb_with_chain();
        let oracle = StructuralReasoner::new(&kb);
        let index = PropertyHierarchyIndex::build(&kb, &oracle).unwrap();

        assert!(index.is_sub_property_of(part_of, related));
        assert!(index.is_sub_property_of(part_of, part_of));
        assert!(!index.is_sub_property_of(related, part_of));
        assert!(index.is_transitive(overlaps));
        assert!(!index.is_transitive(part_of));
        // ordered like the super closures, self first then most specific
        assert_eq!(index.sub_properties(related), &[related, part_of, overlaps]);
    }

    #[test]
    fn chains_and_inverses_come_from_the_store() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let has_part = kb.property("has_part");
        let overlaps = kb.property("overlaps");
        kb.assert_axiom(Axiom::InverseProperties(part_of, has_part));
        kb.assert_axiom(Axiom::PropertyChain {
            chain: vec![part_of, overlaps],
            implies: overlaps,
        });

        let oracle = StructuralReasoner::new(&kb);
        let index = PropertyHierarchyIndex::build(&kb, &oracle).unwrap();
        assert!(index.are_inverse(has_part, part_of));
        let chains = index.chains_from(part_of);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0], (vec![part_of, overlaps], overlaps));
        assert!(index.chains_from(overlaps).is_empty());
    }

    #[test]
    fn oracle_failure_fails_the_build() {
        struct FailingOracle;
        impl ReasonerOracle for FailingOracle {
            fn super_properties(&self, _: SymbolId) -> Result<Vec<SymbolId>, OracleError> {
                Err(OracleError::Backend {
                    message: "connection reset".into(),
                })
            }
            fn sub_properties(&self, _: SymbolId) -> Result<Vec<SymbolId>, OracleError> {
                Ok(Vec::new())
            }
            fn super_classes(
                &self,
                _: NodeId,
                _: bool,
            ) -> Result<Vec<NodeId>, OracleError> {
                Ok(Vec::new())
            }
        }

        let mut kb = KnowledgeBase::new();
        let p = kb.property("p");
        kb.assert_axiom(Axiom::TransitiveProperty(p));

        let err = PropertyHierarchyIndex::build(&kb, &FailingOracle).unwrap_err();
        assert!(matches!(err, EngineError::Oracle(_)));
    }
}
