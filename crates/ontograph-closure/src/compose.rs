//! Composition/reduction of relation chains.
//!
//! [`reduce`] is the pure pairwise table: it collapses two adjacent steps
//! into one exactly when property-hierarchy or transitivity facts justify
//! it, and returns `None` otherwise, leaving un-composable steps side by
//! side in the chain as a longer but still valid path. [`reduce_list`] drives the
//! table over a whole chain to a fixpoint and then contracts declared
//! property-chain windows.

use ontograph_kb::SymbolId;

use crate::hierarchy::PropertyHierarchyIndex;
use crate::relation::QuantifiedRelation;

/// Policy for choosing among several qualifying transitive super-properties.
///
/// The hierarchy can hold incomparable transitive ancestors; any qualifying
/// choice is sound, so the pick is a determinism policy, not a correctness
/// rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Most specific by global hierarchy rank (default).
    #[default]
    IndexRank,
    /// Identifier text order, stable across hierarchy edits.
    Lexical,
}

/// Compose two adjacent steps into one, or `None` if no rule applies.
pub fn reduce(
    r1: &QuantifiedRelation,
    r2: &QuantifiedRelation,
    index: &PropertyHierarchyIndex,
    tie: TieBreak,
) -> Option<QuantifiedRelation> {
    use QuantifiedRelation::*;

    match (r1, r2) {
        // Identity is neutral on either side; this is what erases the
        // reflexive traversal seed from joined chains.
        (IdenticalTo, other) => Some(other.clone()),
        (other, IdenticalTo) => Some(other.clone()),

        (SubClassOf, SubClassOf) => Some(SubClassOf),
        (InstanceOf, SubClassOf) => Some(InstanceOf),

        // Subsumption hoists through a restriction on either side.
        (SubClassOf, PropertySome(p)) | (PropertySome(p), SubClassOf) => Some(PropertySome(*p)),
        (SubClassOf, PropertyOnly(p)) | (PropertyOnly(p), SubClassOf) => Some(PropertyOnly(*p)),

        // Two existential hops collapse when a common transitive
        // super-property covers both.
        (PropertySome(p1), PropertySome(p2)) => {
            transitive_super(*p1, *p2, index, tie).map(PropertySome)
        }
        (PropertyValue(p1), PropertyValue(p2)) => {
            transitive_super(*p1, *p2, index, tie).map(PropertyValue)
        }

        _ => None,
    }
}

/// The transitive property `P` with `p1 ⊑ P` and `p2 ⊑ P`, most specific
/// under the tie-break policy; `None` when no such property exists.
fn transitive_super(
    p1: SymbolId,
    p2: SymbolId,
    index: &PropertyHierarchyIndex,
    tie: TieBreak,
) -> Option<SymbolId> {
    index
        .super_properties(p1)
        .iter()
        .copied()
        .filter(|c| index.is_transitive(*c) && index.is_sub_property_of(p2, *c))
        .min_by_key(|c| match tie {
            TieBreak::IndexRank => index.rank(*c),
            TieBreak::Lexical => index.lexical_rank(*c),
        })
}

/// Normalize a whole relation chain: greedy pairwise reduction to a
/// fixpoint, then declared chain-window contraction, repeated until stable.
/// An empty result (everything erased to identity) comes back as
/// `[IdenticalTo]`.
pub fn reduce_list(
    relations: &[QuantifiedRelation],
    index: &PropertyHierarchyIndex,
    tie: TieBreak,
) -> Vec<QuantifiedRelation> {
    let mut rels: Vec<QuantifiedRelation> = relations.to_vec();
    loop {
        let mut changed = false;

        let mut i = 0;
        while i + 1 < rels.len() {
            if let Some(merged) = reduce(&rels[i], &rels[i + 1], index, tie) {
                rels[i] = merged;
                rels.remove(i + 1);
                changed = true;
                // The merged step may now compose with its left neighbor.
                i = i.saturating_sub(1);
            } else {
                i += 1;
            }
        }

        if let Some((start, len, implied)) = chain_window(&rels, index) {
            rels.splice(start..start + len, [QuantifiedRelation::PropertySome(implied)]);
            changed = true;
        }

        if !changed {
            break;
        }
    }

    if rels.is_empty() {
        rels.push(QuantifiedRelation::IdenticalTo);
    }
    rels
}

/// First declared chain window in the chain: `(start, window length,
/// implied property)`. Every window step must be an existential hop over
/// exactly the declared property.
fn chain_window(
    rels: &[QuantifiedRelation],
    index: &PropertyHierarchyIndex,
) -> Option<(usize, usize, SymbolId)> {
    for start in 0..rels.len() {
        let QuantifiedRelation::PropertySome(first) = &rels[start] else {
            continue;
        };
        for (chain, implies) in index.chains_from(*first) {
            if chain.len() < 2 || start + chain.len() > rels.len() {
                continue;
            }
            let window_matches = chain.iter().enumerate().all(|(k, p)| {
                matches!(&rels[start + k], QuantifiedRelation::PropertySome(q) if q == p)
            });
            if window_matches {
                return Some((start, chain.len(), *implies));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontograph_kb::{Axiom, KnowledgeBase, StructuralReasoner};
    use QuantifiedRelation::*;

    fn index_for(kb: &KnowledgeBase) -> PropertyHierarchyIndex {
        let oracle = StructuralReasoner::new(kb);
        PropertyHierarchyIndex::build(kb, &oracle).unwrap()
    }

    #[test]
    fn subsumption_rules() {
        let kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let index = index_for(&kb);
        let tie = TieBreak::default();

        assert_eq!(reduce(&SubClassOf, &SubClassOf, &index, tie), Some(SubClassOf));
        assert_eq!(reduce(&InstanceOf, &SubClassOf, &index, tie), Some(InstanceOf));
        assert_eq!(
            reduce(&SubClassOf, &PropertySome(part_of), &index, tie),
            Some(PropertySome(part_of))
        );
        assert_eq!(
            reduce(&PropertyOnly(part_of), &SubClassOf, &index, tie),
            Some(PropertyOnly(part_of))
        );
        assert_eq!(reduce(&SubClassOf, &InstanceOf, &index, tie), None);
    }

    #[test]
    fn identity_is_neutral() {
        let kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let index = index_for(&kb);

        assert_eq!(
            reduce(&IdenticalTo, &PropertySome(part_of), &index, TieBreak::default()),
            Some(PropertySome(part_of))
        );
        assert_eq!(
            reduce(&SubClassOf, &IdenticalTo, &index, TieBreak::default()),
            Some(SubClassOf)
        );
    }

    #[test]
    fn transitive_hop_collapses() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        kb.assert_axiom(Axiom::TransitiveProperty(part_of));
        let index = index_for(&kb);

        assert_eq!(
            reduce(
                &PropertySome(part_of),
                &PropertySome(part_of),
                &index,
                TieBreak::default()
            ),
            Some(PropertySome(part_of))
        );
        assert_eq!(
            reduce(
                &PropertyValue(part_of),
                &PropertyValue(part_of),
                &index,
                TieBreak::default()
            ),
            Some(PropertyValue(part_of))
        );
    }

    #[test]
    fn non_transitive_hops_stay_apart() {
        let kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let index = index_for(&kb);

        assert_eq!(
            reduce(
                &PropertySome(part_of),
                &PropertySome(part_of),
                &index,
                TieBreak::default()
            ),
            None
        );
        assert_eq!(
            reduce(&PropertySome(part_of), &PropertyOnly(part_of), &index, TieBreak::default()),
            None
        );
    }

    #[test]
    fn collapse_lifts_to_a_transitive_super_property() {
        let mut kb = KnowledgeBase::new();
        let regulates = kb.property("regulates");
        let neg_reg = kb.property("negatively_regulates");
        kb.assert_axiom(Axiom::SubPropertyOf { sub: neg_reg, sup: regulates });
        kb.assert_axiom(Axiom::TransitiveProperty(regulates));
        let index = index_for(&kb);

        assert_eq!(
            reduce(
                &PropertySome(neg_reg),
                &PropertySome(regulates),
                &index,
                TieBreak::default()
            ),
            Some(PropertySome(regulates))
        );
    }

    #[test]
    fn most_specific_transitive_super_wins() {
        let mut kb = KnowledgeBase::new();
        let p1 = kb.property("p1");
        let p2 = kb.property("p2");
        let narrow = kb.property("narrow");
        let wide = kb.property("wide");
        for sub in [p1, p2] {
            kb.assert_axiom(Axiom::SubPropertyOf { sub, sup: narrow });
        }
        kb.assert_axiom(Axiom::SubPropertyOf { sub: narrow, sup: wide });
        kb.assert_axiom(Axiom::TransitiveProperty(narrow));
        kb.assert_axiom(Axiom::TransitiveProperty(wide));
        let index = index_for(&kb);

        assert_eq!(
            reduce(&PropertySome(p1), &PropertySome(p2), &index, TieBreak::default()),
            Some(PropertySome(narrow))
        );
    }

    #[test]
    fn tie_break_policies_can_disagree() {
        let mut kb = KnowledgeBase::new();
        let p1 = kb.property("p1");
        let p2 = kb.property("p2");
        let specific = kb.property("z_specific");
        let general = kb.property("a_general");
        for sub in [p1, p2] {
            kb.assert_axiom(Axiom::SubPropertyOf { sub, sup: specific });
        }
        kb.assert_axiom(Axiom::SubPropertyOf { sub: specific, sup: general });
        kb.assert_axiom(Axiom::TransitiveProperty(specific));
        kb.assert_axiom(Axiom::TransitiveProperty(general));
        let index = index_for(&kb);

        assert_eq!(
            reduce(&PropertySome(p1), &PropertySome(p2), &index, TieBreak::IndexRank),
            Some(PropertySome(specific))
        );
        assert_eq!(
            reduce(&PropertySome(p1), &PropertySome(p2), &index, TieBreak::Lexical),
            Some(PropertySome(general))
        );
    }

    #[test]
    fn incomparable_supers_rank_by_closure_size() {
        let mut kb = KnowledgeBase::new();
        let p = kb.property("p");
        let alpha = kb.property("alpha");
        let zeta = kb.property("zeta");
        let z = kb.property("z");
        kb.assert_axiom(Axiom::SubPropertyOf { sub: p, sup: alpha });
        kb.assert_axiom(Axiom::SubPropertyOf { sub: p, sup: zeta });
        kb.assert_axiom(Axiom::SubPropertyOf { sub: zeta, sup: z });
        kb.assert_axiom(Axiom::TransitiveProperty(alpha));
        kb.assert_axiom(Axiom::TransitiveProperty(zeta));
        let index = index_for(&kb);

        // alpha has no supers while zeta sits under z, so zeta carries the
        // larger super-closure and outranks the lexically earlier alpha
        assert_eq!(
            reduce(&PropertySome(p), &PropertySome(p), &index, TieBreak::IndexRank),
            Some(PropertySome(zeta))
        );
        assert_eq!(
            reduce(&PropertySome(p), &PropertySome(p), &index, TieBreak::Lexical),
            Some(PropertySome(alpha))
        );
    }

    #[test]
    fn list_reduction_reaches_a_fixpoint() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        kb.assert_axiom(Axiom::TransitiveProperty(part_of));
        let index = index_for(&kb);

        let reduced = reduce_list(
            &[
                SubClassOf,
                SubClassOf,
                PropertySome(part_of),
                SubClassOf,
                PropertySome(part_of),
            ],
            &index,
            TieBreak::default(),
        );
        assert_eq!(reduced, vec![PropertySome(part_of)]);
    }

    #[test]
    fn chain_window_contracts_after_pairwise_hoisting() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let regulates = kb.property("regulates");
        kb.assert_axiom(Axiom::PropertyChain {
            chain: vec![regulates, part_of],
            implies: regulates,
        });
        let index = index_for(&kb);

        // The intervening SubClassOf hoists away, exposing the window.
        let reduced = reduce_list(
            &[PropertySome(regulates), SubClassOf, PropertySome(part_of)],
            &index,
            TieBreak::default(),
        );
        assert_eq!(reduced, vec![PropertySome(regulates)]);
    }

    #[test]
    fn unreducible_chain_is_kept_ordered() {
        let kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let develops_from = kb.property("develops_from");
        let index = index_for(&kb);

        let chain = [PropertySome(part_of), PropertySome(develops_from)];
        assert_eq!(reduce_list(&chain, &index, TieBreak::default()), chain.to_vec());
    }

    #[test]
    fn empty_chain_becomes_identity() {
        let kb = KnowledgeBase::new();
        let index = index_for(&kb);
        assert_eq!(reduce_list(&[], &index, TieBreak::default()), vec![IdenticalTo]);
        assert_eq!(
            reduce_list(&[IdenticalTo, IdenticalTo], &index, TieBreak::default()),
            vec![IdenticalTo]
        );
    }
}
