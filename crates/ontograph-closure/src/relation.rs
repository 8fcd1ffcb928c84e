//! Quantified relations and the edges that carry them.
//!
//! An edge step is more than is-a: it records how the target is reached
//! (plain subsumption, instantiation, or a property-qualified hop). A chain
//! of steps that resists reduction stays an ordered list (a linear
//! expression path) that the translator can fold back into a nested
//! restriction.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use ontograph_kb::{NodeId, SymbolId};

/// One step of an edge's relation chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantifiedRelation {
    SubClassOf,
    InstanceOf,
    IdenticalTo,
    /// Existential property step: source ⊑ ∃property.target.
    PropertySome(SymbolId),
    /// Universal property step: source ⊑ ∀property.target.
    PropertyOnly(SymbolId),
    /// Asserted property value between individuals.
    PropertyValue(SymbolId),
    /// Cardinality-bounded step. Representable but never produced by
    /// seeding; no reduction rule touches it.
    PropertyCardinality {
        property: SymbolId,
        min: Option<u32>,
        max: Option<u32>,
    },
}

impl QuantifiedRelation {
    /// The property a step is qualified by, `None` for the plain relations.
    pub fn property(&self) -> Option<SymbolId> {
        match self {
            QuantifiedRelation::PropertySome(p)
            | QuantifiedRelation::PropertyOnly(p)
            | QuantifiedRelation::PropertyValue(p)
            | QuantifiedRelation::PropertyCardinality { property: p, .. } => Some(*p),
            _ => None,
        }
    }

    /// Same step kind, requalified over another property.
    pub fn with_property(&self, property: SymbolId) -> QuantifiedRelation {
        match self {
            QuantifiedRelation::PropertySome(_) => QuantifiedRelation::PropertySome(property),
            QuantifiedRelation::PropertyOnly(_) => QuantifiedRelation::PropertyOnly(property),
            QuantifiedRelation::PropertyValue(_) => QuantifiedRelation::PropertyValue(property),
            QuantifiedRelation::PropertyCardinality { min, max, .. } => {
                QuantifiedRelation::PropertyCardinality {
                    property,
                    min: *min,
                    max: *max,
                }
            }
            other => other.clone(),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, QuantifiedRelation::IdenticalTo)
    }
}

/// A directed edge: source reaches target through an ordered relation chain.
///
/// `distance` counts the axiom/seed hops folded into the edge. It is
/// informational only and excluded from equality and hashing: two routes
/// that reduce to the same chain are the same edge, and the closure keeps
/// the shorter distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub relations: Vec<QuantifiedRelation>,
    pub distance: u32,
    pub target: NodeId,
}

impl Edge {
    pub fn new(
        source: NodeId,
        relations: Vec<QuantifiedRelation>,
        distance: u32,
        target: NodeId,
    ) -> Self {
        Self {
            source,
            relations,
            distance,
            target,
        }
    }

    /// The reflexive edge every traversal starts from.
    pub fn identity(node: NodeId) -> Self {
        Self::new(node, vec![QuantifiedRelation::IdenticalTo], 0, node)
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
            && self.relations.len() == 1
            && self.relations[0].is_identity()
    }

    /// The chain's only step, if it reduced to a single one.
    pub fn single_relation(&self) -> Option<&QuantifiedRelation> {
        match self.relations.as_slice() {
            [rel] => Some(rel),
            _ => None,
        }
    }

    pub fn first_relation(&self) -> Option<&QuantifiedRelation> {
        self.relations.first()
    }

    pub fn final_relation(&self) -> Option<&QuantifiedRelation> {
        self.relations.last()
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.relations == other.relations
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.target.hash(state);
        self.relations.hash(state);
    }
}
