//! Derived-edge readback as interned expressions.

use ontograph_kb::{KnowledgeBase, NodeId};

use crate::relation::{Edge, QuantifiedRelation};
use crate::EngineError;

/// Fold an edge's relation list back into the expression the edge asserts of
/// its source. The fold runs from the target inward: quantified steps wrap
/// the accumulated expression in the matching restriction, plain steps
/// (subclass, instance, identity) leave it as is. Results are interned, so
/// equal edges translate to the identical node.
///
/// A value step reads existentially at this granularity: `x p-value v`
/// becomes `p some v`, the weakest restriction the assertion entails.
///
/// Cardinality steps have no expression form in the five-shape node model
/// and fail with [`EngineError::StructuralViolation`].
pub fn edge_to_target_expression(kb: &KnowledgeBase, edge: &Edge) -> Result<NodeId, EngineError> {
    let mut expr = edge.target;
    for relation in edge.relations.iter().rev() {
        expr = match relation {
            QuantifiedRelation::SubClassOf
            | QuantifiedRelation::InstanceOf
            | QuantifiedRelation::IdenticalTo => expr,
            QuantifiedRelation::PropertySome(p) => kb.some_values_from(*p, expr),
            QuantifiedRelation::PropertyOnly(p) => kb.only_values_from(*p, expr),
            QuantifiedRelation::PropertyValue(p) => kb.some_values_from(*p, expr),
            QuantifiedRelation::PropertyCardinality { property, min, max } => {
                let lo = min.map_or_else(|| String::from("0"), |m| m.to_string());
                let hi = max.map_or_else(|| String::from("*"), |m| m.to_string());
                return Err(EngineError::StructuralViolation {
                    message: format!(
                        "cardinality step over {} ({lo}..{hi}) has no expression form",
                        kb.render_symbol(*property)
                    ),
                });
            }
        };
    }
    Ok(expr)
}
