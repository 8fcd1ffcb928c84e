//! Self-contained subset extraction.
//!
//! A subset is grown from seed entities upward: the signature closure is the
//! union of the seeds' reflexive named ancestors, and the extracted axiom set
//! is every axiom whose entire named signature lies inside that closure. The
//! result mentions nothing outside itself, so it can be loaded or reasoned
//! over stand-alone. Property-level axioms carry no named entities and travel
//! with every subset; dropping them would silently change what the extracted
//! module entails.

use roaring::RoaringBitmap;
use tracing::debug;

use ontograph_closure::ClosureEngine;
use ontograph_kb::{Axiom, KnowledgeBase, Node, NodeId};

use crate::{require_named, AnalysisError};

/// Union of the seeds' reflexive named-ancestor sets, as a bitmap over raw
/// node IDs. Seeds must be named entities.
pub fn signature_closure(
    kb: &KnowledgeBase,
    engine: &ClosureEngine,
    seeds: &[NodeId],
) -> Result<RoaringBitmap, AnalysisError> {
    let mut closure = RoaringBitmap::new();
    for &seed in seeds {
        require_named(kb, seed, "subset seed")?;
        let ancestors = engine.closure_of(kb, seed, true)?;
        for id in ancestors.endpoints() {
            if kb.node(id).is_some_and(|n| n.is_named()) {
                closure.insert(id.raw());
            }
        }
    }
    Ok(closure)
}

/// The axioms whose entire named signature lies inside the signature closure
/// of `seeds`, in assertion order.
pub fn axioms_for_subset(
    kb: &KnowledgeBase,
    engine: &ClosureEngine,
    seeds: &[NodeId],
) -> Result<Vec<Axiom>, AnalysisError> {
    let signature = signature_closure(kb, engine, seeds)?;
    let mut kept = Vec::new();
    let mut total = 0usize;
    for axiom in kb.axioms().iter() {
        total += 1;
        if named_signature(kb, &axiom.node_refs()).is_subset(&signature) {
            kept.push(axiom.clone());
        }
    }
    debug!(
        seeds = seeds.len(),
        signature = signature.len(),
        kept = kept.len(),
        total,
        "extracted subset"
    );
    Ok(kept)
}

/// Named entities mentioned anywhere inside the given expression roots.
fn named_signature(kb: &KnowledgeBase, roots: &[NodeId]) -> RoaringBitmap {
    let mut named = RoaringBitmap::new();
    let mut seen = RoaringBitmap::new();
    let mut stack: Vec<NodeId> = roots.to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id.raw()) {
            continue;
        }
        match kb.node(id) {
            Some(Node::Named(_)) => {
                named.insert(id.raw());
            }
            Some(Node::Intersection(operands)) | Some(Node::Union(operands)) => {
                stack.extend(operands);
            }
            Some(Node::SomeValuesFrom { filler, .. })
            | Some(Node::OnlyValuesFrom { filler, .. }) => {
                stack.push(filler);
            }
            None => {}
        }
    }
    named
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontograph_closure::EngineConfig;
    use ontograph_kb::StructuralReasoner;

    fn engine_for(kb: &KnowledgeBase) -> ClosureEngine {
        let oracle = StructuralReasoner::new(kb);
        ClosureEngine::build(kb, &oracle, EngineConfig::default()).unwrap()
    }

    #[test]
    fn closure_covers_restriction_fillers_but_not_cousins() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let nucleus = kb.named("nucleus");
        let organelle = kb.named("organelle");
        let cell = kb.named("cell");
        let ribosome = kb.named("ribosome");
        let in_cell = kb.some_values_from(part_of, cell);
        kb.assert_axiom(Axiom::SubClassOf { sub: nucleus, sup: organelle });
        kb.assert_axiom(Axiom::SubClassOf { sub: organelle, sup: in_cell });
        kb.assert_axiom(Axiom::SubClassOf { sub: ribosome, sup: organelle });

        let engine = engine_for(&kb);
        let signature = signature_closure(&kb, &engine, &[nucleus]).unwrap();
        for id in [nucleus, organelle, cell] {
            assert!(signature.contains(id.raw()));
        }
        assert!(!signature.contains(ribosome.raw()));
        assert!(!signature.contains(in_cell.raw()));
    }

    #[test]
    fn extracted_axioms_stay_inside_the_signature() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let nucleus = kb.named("nucleus");
        let organelle = kb.named("organelle");
        let cell = kb.named("cell");
        let ribosome = kb.named("ribosome");
        let in_cell = kb.some_values_from(part_of, cell);
        let inside = Axiom::SubClassOf { sub: nucleus, sup: organelle };
        let restriction = Axiom::SubClassOf { sub: organelle, sup: in_cell };
        let outside = Axiom::SubClassOf { sub: ribosome, sup: organelle };
        let property = Axiom::TransitiveProperty(part_of);
        kb.assert_axiom(inside.clone());
        kb.assert_axiom(restriction.clone());
        kb.assert_axiom(outside.clone());
        kb.assert_axiom(property.clone());

        let engine = engine_for(&kb);
        let module = axioms_for_subset(&kb, &engine, &[nucleus]).unwrap();
        assert!(module.contains(&inside));
        assert!(module.contains(&restriction));
        assert!(module.contains(&property));
        assert!(!module.contains(&outside));

        // every named entity any kept axiom mentions is in the closure
        let signature = signature_closure(&kb, &engine, &[nucleus]).unwrap();
        for axiom in &module {
            assert!(named_signature(&kb, &axiom.node_refs()).is_subset(&signature));
        }
    }

    #[test]
    fn anonymous_seeds_are_refused() {
        let kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let cell = kb.named("cell");
        let in_cell = kb.some_values_from(part_of, cell);

        let engine = engine_for(&kb);
        let err = signature_closure(&kb, &engine, &[in_cell]).unwrap_err();
        assert!(matches!(err, AnalysisError::StructuralViolation { .. }));
    }
}
