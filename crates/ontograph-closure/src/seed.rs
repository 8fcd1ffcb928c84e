//! Direct (non-transitive) edge seeding.
//!
//! The seed table `E0` is everything the closure traversal composes over,
//! derived from two sources. Axiom rules: subclass, pairwise equivalence in
//! both directions, class assertions, property assertions (and, when an
//! inverse is declared, the flipped assertion over the inverse
//! property). Structure rules: a restriction points at its filler, an
//! intersection at each operand, and each union operand points at its union.
//!
//! Rows are materialized by source and by target for the two traversal
//! directions. The table is a snapshot: it covers the arena as of the build,
//! and nodes interned later (queries synthesize expressions at any time) get
//! their structure-derived rows computed on demand.

use ahash::{AHashMap, AHashSet};
use std::borrow::Cow;
use tracing::debug;

use ontograph_kb::{Axiom, KnowledgeBase, Node, NodeId, ReasonerOracle, SymbolId};

use crate::engine::EngineConfig;
use crate::relation::{Edge, QuantifiedRelation};
use crate::EngineError;

pub struct SeedIndex {
    by_source: AHashMap<NodeId, Vec<Edge>>,
    by_target: AHashMap<NodeId, Vec<Edge>>,
    /// Arena length at build time
    built_nodes: u32,
    edge_count: usize,
    excluded_properties: AHashSet<SymbolId>,
    excluded_targets: AHashSet<SymbolId>,
}

impl SeedIndex {
    /// Materialize `E0` for the current snapshot. The oracle is consulted
    /// only when the config asks for reasoner-primed is-a seeds.
    pub fn build(
        kb: &KnowledgeBase,
        oracle: &dyn ReasonerOracle,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let built_nodes = kb.nodes().len() as u32;
        let mut builder = SeedBuilder {
            by_source: AHashMap::new(),
            by_target: AHashMap::new(),
            seen: AHashSet::new(),
            edge_count: 0,
            excluded_properties: config.excluded_properties.clone(),
            excluded_targets: config.excluded_targets.clone(),
        };

        // Inverse partners, for flipping property assertions.
        let mut inverse_partners: AHashMap<SymbolId, Vec<SymbolId>> = AHashMap::new();
        for axiom in kb.axioms().iter() {
            if let Axiom::InverseProperties(p, q) = axiom {
                inverse_partners.entry(*p).or_default().push(*q);
                inverse_partners.entry(*q).or_default().push(*p);
            }
        }

        // Structure rules over every interned node.
        for id in kb.nodes().ids() {
            for edge in structure_edges_outgoing(kb, id) {
                builder.push(kb, edge);
            }
            for edge in structure_edges_incoming(kb, id) {
                builder.push(kb, edge);
            }
        }

        // Axiom rules.
        for axiom in kb.axioms().iter() {
            match axiom {
                Axiom::SubClassOf { sub, sup } => {
                    builder.push(
                        kb,
                        Edge::new(*sub, vec![QuantifiedRelation::SubClassOf], 1, *sup),
                    );
                }
                Axiom::EquivalentClasses { operands } => {
                    for a in operands {
                        for b in operands {
                            if a != b {
                                builder.push(
                                    kb,
                                    Edge::new(*a, vec![QuantifiedRelation::SubClassOf], 1, *b),
                                );
                            }
                        }
                    }
                }
                Axiom::ClassAssertion { individual, class } => {
                    builder.push(
                        kb,
                        Edge::new(*individual, vec![QuantifiedRelation::InstanceOf], 1, *class),
                    );
                }
                Axiom::PropertyAssertion {
                    subject,
                    property,
                    object,
                } => {
                    builder.push(
                        kb,
                        Edge::new(
                            *subject,
                            vec![QuantifiedRelation::PropertyValue(*property)],
                            1,
                            *object,
                        ),
                    );
                    for q in inverse_partners.get(property).into_iter().flatten() {
                        builder.push(
                            kb,
                            Edge::new(
                                *object,
                                vec![QuantifiedRelation::PropertyValue(*q)],
                                1,
                                *subject,
                            ),
                        );
                    }
                }
                _ => {}
            }
        }

        // Reasoner-primed is-a seeds for named entities whose direct
        // superclasses the axioms understate.
        if config.seed_inferred_subclass {
            for id in kb.nodes().ids() {
                let is_named = kb.node(id).is_some_and(|n| n.is_named());
                if !is_named {
                    continue;
                }
                for sup in oracle.super_classes(id, true)? {
                    builder.push(
                        kb,
                        Edge::new(id, vec![QuantifiedRelation::SubClassOf], 1, sup),
                    );
                }
            }
        }

        debug!(
            edges = builder.edge_count,
            nodes = built_nodes,
            "seeded direct edge table"
        );

        Ok(Self {
            by_source: builder.by_source,
            by_target: builder.by_target,
            built_nodes,
            edge_count: builder.edge_count,
            excluded_properties: builder.excluded_properties,
            excluded_targets: builder.excluded_targets,
        })
    }

    /// Snapshot row of direct edges out of `node`.
    pub fn outgoing(&self, node: NodeId) -> &[Edge] {
        self.by_source.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Snapshot row of direct edges into `node`.
    pub fn incoming(&self, node: NodeId) -> &[Edge] {
        self.by_target.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct edges out of `node`, covering nodes interned after the build
    /// with their structure-derived rows.
    pub fn outgoing_with_structure(&self, kb: &KnowledgeBase, node: NodeId) -> Cow<'_, [Edge]> {
        if node.raw() < self.built_nodes {
            return Cow::Borrowed(self.outgoing(node));
        }
        Cow::Owned(
            structure_edges_outgoing(kb, node)
                .into_iter()
                .filter(|e| !self.is_filtered(kb, e))
                .collect(),
        )
    }

    /// Direct edges into `node`, covering nodes interned after the build.
    pub fn incoming_with_structure(&self, kb: &KnowledgeBase, node: NodeId) -> Cow<'_, [Edge]> {
        if node.raw() < self.built_nodes {
            return Cow::Borrowed(self.incoming(node));
        }
        Cow::Owned(
            structure_edges_incoming(kb, node)
                .into_iter()
                .filter(|e| !self.is_filtered(kb, e))
                .collect(),
        )
    }

    /// Total seeded edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    fn is_filtered(&self, kb: &KnowledgeBase, edge: &Edge) -> bool {
        edge_filtered(
            kb,
            edge,
            &self.excluded_properties,
            &self.excluded_targets,
        )
    }
}

struct SeedBuilder {
    by_source: AHashMap<NodeId, Vec<Edge>>,
    by_target: AHashMap<NodeId, Vec<Edge>>,
    seen: AHashSet<Edge>,
    edge_count: usize,
    excluded_properties: AHashSet<SymbolId>,
    excluded_targets: AHashSet<SymbolId>,
}

impl SeedBuilder {
    fn push(&mut self, kb: &KnowledgeBase, edge: Edge) {
        if edge_filtered(kb, &edge, &self.excluded_properties, &self.excluded_targets) {
            return;
        }
        if !self.seen.insert(edge.clone()) {
            return;
        }
        self.by_source
            .entry(edge.source)
            .or_default()
            .push(edge.clone());
        self.by_target.entry(edge.target).or_default().push(edge);
        self.edge_count += 1;
    }
}

pub(crate) fn edge_filtered(
    kb: &KnowledgeBase,
    edge: &Edge,
    excluded_properties: &AHashSet<SymbolId>,
    excluded_targets: &AHashSet<SymbolId>,
) -> bool {
    if let Some(p) = edge.final_relation().and_then(QuantifiedRelation::property) {
        if excluded_properties.contains(&p) {
            return true;
        }
    }
    if let Some(sym) = kb.node(edge.target).and_then(|n| n.named_symbol()) {
        if excluded_targets.contains(&sym) {
            return true;
        }
    }
    false
}

/// Structure-derived edges out of a node, from its own shape.
fn structure_edges_outgoing(kb: &KnowledgeBase, id: NodeId) -> Vec<Edge> {
    match kb.node(id) {
        Some(Node::Intersection(operands)) => operands
            .into_iter()
            .map(|op| Edge::new(id, vec![QuantifiedRelation::SubClassOf], 1, op))
            .collect(),
        Some(Node::SomeValuesFrom { property, filler }) => vec![Edge::new(
            id,
            vec![QuantifiedRelation::PropertySome(property)],
            1,
            filler,
        )],
        Some(Node::OnlyValuesFrom { property, filler }) => vec![Edge::new(
            id,
            vec![QuantifiedRelation::PropertyOnly(property)],
            1,
            filler,
        )],
        _ => Vec::new(),
    }
}

/// Structure-derived edges into a node: union operands point at their union.
fn structure_edges_incoming(kb: &KnowledgeBase, id: NodeId) -> Vec<Edge> {
    match kb.node(id) {
        Some(Node::Union(operands)) => operands
            .into_iter()
            .map(|op| Edge::new(op, vec![QuantifiedRelation::SubClassOf], 1, id))
            .collect(),
        _ => Vec::new(),
    }
}
