//! Engine facade: snapshot state, cached queries, staleness checks.
//!
//! A [`ClosureEngine`] is built from one knowledge-base snapshot and owns
//! everything derived from it: the seed table, the property hierarchy index,
//! and per-node closure caches. Queries take the knowledge base by reference
//! rather than holding it, so the caller stays free to mutate axioms between
//! calls; every query first compares the store's revision against the one the
//! engine was built at and fails with [`EngineError::IndexStale`] on any
//! mismatch. [`ClosureEngine::invalidate`] reseeds, rebuilds the index, and
//! clears the caches wholesale. There is no finer-grained invalidation.
//!
//! Caches are `dashmap`s of shared closures, safe for concurrent readers.
//! Writers (axiom mutation plus `invalidate`) need exclusive access, which is
//! the caller's discipline to impose.

use ahash::AHashSet;
use dashmap::DashMap;
use roaring::RoaringBitmap;
use std::sync::Arc;
use tracing::debug;

use ontograph_kb::{KnowledgeBase, NodeId, ReasonerOracle, SymbolId};

use crate::compose::TieBreak;
use crate::hierarchy::PropertyHierarchyIndex;
use crate::relation::{Edge, QuantifiedRelation};
use crate::seed::{edge_filtered, SeedIndex};
use crate::translate::edge_to_target_expression;
use crate::traverse::{incoming_closure, outgoing_closure, Closure};
use crate::EngineError;

/// Default bound on node expansions per closure query.
pub const DEFAULT_WORKLIST_LIMIT: usize = 1 << 20;

/// Build- and query-time knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How rule-3 composition breaks ties between equally specific
    /// super-properties.
    pub tie_break: TieBreak,
    /// Also seed `SubClassOf` edges from the oracle's direct superclasses,
    /// covering entailments the asserted axioms understate.
    pub seed_inferred_subclass: bool,
    /// Properties whose quantified edges are dropped at seeding and
    /// traversal time.
    pub excluded_properties: AHashSet<SymbolId>,
    /// Named targets (top/meta classes, usually) whose edges are dropped.
    pub excluded_targets: AHashSet<SymbolId>,
    /// Maximum node expansions per closure query before aborting with
    /// [`EngineError::ClosureAborted`].
    pub worklist_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            seed_inferred_subclass: false,
            excluded_properties: AHashSet::new(),
            excluded_targets: AHashSet::new(),
            worklist_limit: DEFAULT_WORKLIST_LIMIT,
        }
    }
}

impl EngineConfig {
    pub(crate) fn is_excluded_edge(&self, kb: &KnowledgeBase, edge: &Edge) -> bool {
        edge_filtered(kb, edge, &self.excluded_properties, &self.excluded_targets)
    }
}

/// Closure queries over one knowledge-base snapshot.
pub struct ClosureEngine {
    config: EngineConfig,
    seeds: SeedIndex,
    hierarchy: PropertyHierarchyIndex,
    /// Axiom-store revision the snapshot was taken at
    built_at: u64,
    outgoing: DashMap<(NodeId, bool), Arc<Closure>>,
    incoming: DashMap<(NodeId, bool), Arc<Closure>>,
    expressions: DashMap<Edge, NodeId>,
}

impl ClosureEngine {
    /// Seed the edge table and prime the property hierarchy from the current
    /// snapshot. Fails if the oracle fails; a partial index would silently
    /// under-reduce relation chains, so there is no degraded mode.
    pub fn build(
        kb: &KnowledgeBase,
        oracle: &dyn ReasonerOracle,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let hierarchy = PropertyHierarchyIndex::build(kb, oracle)?;
        let seeds = SeedIndex::build(kb, oracle, &config)?;
        let built_at = kb.revision();
        debug!(
            revision = built_at,
            seed_edges = seeds.edge_count(),
            properties = hierarchy.property_count(),
            "closure engine built"
        );
        Ok(Self {
            config,
            seeds,
            hierarchy,
            built_at,
            outgoing: DashMap::new(),
            incoming: DashMap::new(),
            expressions: DashMap::new(),
        })
    }

    /// Reseed and reindex after axiom mutation, dropping every cached
    /// closure and translation.
    pub fn invalidate(
        &mut self,
        kb: &KnowledgeBase,
        oracle: &dyn ReasonerOracle,
    ) -> Result<(), EngineError> {
        self.hierarchy = PropertyHierarchyIndex::build(kb, oracle)?;
        self.seeds = SeedIndex::build(kb, oracle, &self.config)?;
        self.built_at = kb.revision();
        self.outgoing.clear();
        self.incoming.clear();
        self.expressions.clear();
        debug!(revision = self.built_at, "engine reseeded, caches cleared");
        Ok(())
    }

    /// Revision the current snapshot was taken at.
    pub fn built_at(&self) -> u64 {
        self.built_at
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hierarchy(&self) -> &PropertyHierarchyIndex {
        &self.hierarchy
    }

    pub fn seed_index(&self) -> &SeedIndex {
        &self.seeds
    }

    /// Number of cached closures across both directions.
    pub fn cached_closures(&self) -> usize {
        self.outgoing.len() + self.incoming.len()
    }

    fn ensure_fresh(&self, kb: &KnowledgeBase) -> Result<(), EngineError> {
        let current = kb.revision();
        if current != self.built_at {
            return Err(EngineError::IndexStale {
                built_at: self.built_at,
                current,
            });
        }
        Ok(())
    }

    /// Cached outgoing closure of `node`.
    pub fn closure_of(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
        reflexive: bool,
    ) -> Result<Arc<Closure>, EngineError> {
        self.ensure_fresh(kb)?;
        if let Some(hit) = self.outgoing.get(&(node, reflexive)) {
            return Ok(Arc::clone(hit.value()));
        }
        let closure = Arc::new(outgoing_closure(
            kb,
            &self.seeds,
            &self.hierarchy,
            &self.config,
            node,
            reflexive,
        )?);
        self.outgoing.insert((node, reflexive), Arc::clone(&closure));
        Ok(closure)
    }

    /// Cached incoming closure of `node`.
    pub fn incoming_closure_of(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
        reflexive: bool,
    ) -> Result<Arc<Closure>, EngineError> {
        self.ensure_fresh(kb)?;
        if let Some(hit) = self.incoming.get(&(node, reflexive)) {
            return Ok(Arc::clone(hit.value()));
        }
        let closure = Arc::new(incoming_closure(
            kb,
            &self.seeds,
            &self.hierarchy,
            &self.config,
            node,
            reflexive,
        )?);
        self.incoming.insert((node, reflexive), Arc::clone(&closure));
        Ok(closure)
    }

    /// Edges out of `node`: the seeded direct row when `closure` is false,
    /// the derived closure otherwise. The identity edge is prepended in
    /// either mode when `reflexive` is set.
    pub fn outgoing_edges(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
        closure: bool,
        reflexive: bool,
    ) -> Result<Vec<Edge>, EngineError> {
        if closure {
            return Ok(self.closure_of(kb, node, reflexive)?.edges().to_vec());
        }
        self.ensure_fresh(kb)?;
        let mut edges = Vec::new();
        if reflexive {
            edges.push(Edge::identity(node));
        }
        edges.extend(self.seeds.outgoing_with_structure(kb, node).iter().cloned());
        Ok(edges)
    }

    /// Derived edges into `node`.
    pub fn incoming_edges_closure(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
    ) -> Result<Vec<Edge>, EngineError> {
        Ok(self.incoming_closure_of(kb, node, false)?.edges().to_vec())
    }

    /// Every node reachable from `node`, in raw-id order.
    pub fn ancestors(&self, kb: &KnowledgeBase, node: NodeId) -> Result<Vec<NodeId>, EngineError> {
        Ok(self.closure_of(kb, node, false)?.endpoints().collect())
    }

    /// Ancestors that are named entities.
    pub fn named_ancestors(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
    ) -> Result<Vec<NodeId>, EngineError> {
        let closure = self.closure_of(kb, node, false)?;
        Ok(closure
            .endpoints()
            .filter(|&id| kb.node(id).is_some_and(|n| n.is_named()))
            .collect())
    }

    /// Ancestor set as a bitmap over raw node IDs, for cheap intersection.
    pub fn ancestor_set(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
    ) -> Result<RoaringBitmap, EngineError> {
        Ok(self.closure_of(kb, node, false)?.endpoint_set().clone())
    }

    /// Ancestors reachable through edges whose every step is plain
    /// (subclass, instance, identity) or quantified over one of `properties`.
    /// With `strict`, at least one quantified step is required, so the plain
    /// is-a ancestors drop out.
    pub fn ancestors_over(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
        properties: &[SymbolId],
        strict: bool,
    ) -> Result<Vec<NodeId>, EngineError> {
        let allowed: AHashSet<SymbolId> = properties.iter().copied().collect();
        let closure = self.closure_of(kb, node, false)?;
        let mut found = RoaringBitmap::new();
        for edge in closure.edges() {
            let mut quantified_steps = 0usize;
            let mut qualifies = true;
            for relation in &edge.relations {
                match relation {
                    QuantifiedRelation::SubClassOf
                    | QuantifiedRelation::InstanceOf
                    | QuantifiedRelation::IdenticalTo => {}
                    QuantifiedRelation::PropertySome(p) | QuantifiedRelation::PropertyValue(p)
                        if allowed.contains(p) =>
                    {
                        quantified_steps += 1;
                    }
                    _ => {
                        qualifies = false;
                        break;
                    }
                }
            }
            if qualifies && (!strict || quantified_steps > 0) {
                found.insert(edge.target.raw());
            }
        }
        Ok(found.iter().map(NodeId::new).collect())
    }

    /// Every node that reaches `node`, in raw-id order.
    pub fn descendants(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
    ) -> Result<Vec<NodeId>, EngineError> {
        Ok(self.incoming_closure_of(kb, node, false)?.endpoints().collect())
    }

    /// Descendants that are named entities.
    pub fn named_descendants(
        &self,
        kb: &KnowledgeBase,
        node: NodeId,
    ) -> Result<Vec<NodeId>, EngineError> {
        let closure = self.incoming_closure_of(kb, node, false)?;
        Ok(closure
            .endpoints()
            .filter(|&id| kb.node(id).is_some_and(|n| n.is_named()))
            .collect())
    }

    /// Derived edges from `source` to `target`.
    pub fn edges_between(
        &self,
        kb: &KnowledgeBase,
        source: NodeId,
        target: NodeId,
    ) -> Result<Vec<Edge>, EngineError> {
        let closure = self.closure_of(kb, source, false)?;
        Ok(closure.edges_with(target).cloned().collect())
    }

    /// Individuals whose derived relation to `class` is exactly instance-of.
    pub fn instances(&self, kb: &KnowledgeBase, class: NodeId) -> Result<Vec<NodeId>, EngineError> {
        let closure = self.incoming_closure_of(kb, class, false)?;
        let mut found = RoaringBitmap::new();
        for edge in closure.edges() {
            if edge.relations == [QuantifiedRelation::InstanceOf] {
                found.insert(edge.source.raw());
            }
        }
        Ok(found.iter().map(NodeId::new).collect())
    }

    /// Generalizations of `edge`: the cartesian substitution of every
    /// quantified property by each of its non-excluded super-properties.
    /// The first combination is the edge itself, since super-property
    /// closures are reflexive.
    pub fn edge_subsumers(
        &self,
        kb: &KnowledgeBase,
        edge: &Edge,
    ) -> Result<Vec<Edge>, EngineError> {
        self.ensure_fresh(kb)?;
        let mut lists: Vec<Vec<QuantifiedRelation>> = vec![Vec::with_capacity(edge.relations.len())];
        for relation in &edge.relations {
            let options: Vec<QuantifiedRelation> = match relation.property() {
                Some(p) => {
                    let supers: Vec<SymbolId> = self
                        .hierarchy
                        .super_properties(p)
                        .iter()
                        .copied()
                        .filter(|q| !self.config.excluded_properties.contains(q))
                        .collect();
                    if supers.is_empty() {
                        vec![relation.clone()]
                    } else {
                        supers.iter().map(|&q| relation.with_property(q)).collect()
                    }
                }
                None => vec![relation.clone()],
            };
            let mut next = Vec::with_capacity(lists.len() * options.len());
            for prefix in &lists {
                for option in &options {
                    let mut list = prefix.clone();
                    list.push(option.clone());
                    next.push(list);
                }
            }
            lists = next;
        }
        Ok(lists
            .into_iter()
            .map(|relations| Edge::new(edge.source, relations, edge.distance, edge.target))
            .collect())
    }

    /// Cached translation of a derived edge into the interned expression it
    /// asserts of its source.
    pub fn target_expression(
        &self,
        kb: &KnowledgeBase,
        edge: &Edge,
    ) -> Result<NodeId, EngineError> {
        self.ensure_fresh(kb)?;
        if let Some(hit) = self.expressions.get(edge) {
            return Ok(*hit.value());
        }
        let node = edge_to_target_expression(kb, edge)?;
        self.expressions.insert(edge.clone(), node);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontograph_kb::{Axiom, StructuralReasoner};

    fn engine(kb: &KnowledgeBase) -> ClosureEngine {
        let oracle = StructuralReasoner::new(kb);
        ClosureEngine::build(kb, &oracle, EngineConfig::default()).unwrap()
    }

    #[test]
    fn ancestors_and_cache_sharing() {
        let mut kb = KnowledgeBase::new();
        let a = kb.named("a");
        let b = kb.named("b");
        let c = kb.named("c");
        kb.assert_axiom(Axiom::SubClassOf { sub: a, sup: b });
        kb.assert_axiom(Axiom::SubClassOf { sub: b, sup: c });

        let engine = engine(&kb);
        assert_eq!(engine.ancestors(&kb, a).unwrap(), vec![b, c]);
        assert_eq!(engine.descendants(&kb, c).unwrap(), vec![a, b]);

        let first = engine.closure_of(&kb, a, false).unwrap();
        let second = engine.closure_of(&kb, a, false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cached_closures(), 2);
    }

    #[test]
    fn mutation_without_invalidate_is_an_error() {
        let mut kb = KnowledgeBase::new();
        let a = kb.named("a");
        let b = kb.named("b");
        kb.assert_axiom(Axiom::SubClassOf { sub: a, sup: b });

        let mut engine = engine(&kb);
        assert!(engine.ancestors(&kb, a).is_ok());

        let c = kb.named("c");
        kb.assert_axiom(Axiom::SubClassOf { sub: b, sup: c });
        let err = engine.ancestors(&kb, a).unwrap_err();
        assert!(matches!(
            err,
            EngineError::IndexStale { built_at: 1, current: 2 }
        ));

        let oracle = StructuralReasoner::new(&kb);
        engine.invalidate(&kb, &oracle).unwrap();
        assert_eq!(engine.ancestors(&kb, a).unwrap(), vec![b, c]);
        assert_eq!(engine.built_at(), 2);
    }

    #[test]
    fn direct_mode_returns_the_seed_row() {
        let mut kb = KnowledgeBase::new();
        let a = kb.named("a");
        let b = kb.named("b");
        let c = kb.named("c");
        kb.assert_axiom(Axiom::SubClassOf { sub: a, sup: b });
        kb.assert_axiom(Axiom::SubClassOf { sub: b, sup: c });

        let engine = engine(&kb);
        let direct = engine.outgoing_edges(&kb, a, false, false).unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].target, b);

        let reflexive = engine.outgoing_edges(&kb, a, false, true).unwrap();
        assert_eq!(reflexive.len(), 2);
        assert!(reflexive[0].is_identity());

        let closed = engine.outgoing_edges(&kb, a, true, false).unwrap();
        assert_eq!(closed.len(), 2);
    }

    #[test]
    fn ancestors_over_filters_by_property_and_strictness() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let develops_from = kb.property("develops_from");
        let nucleus = kb.named("nucleus");
        let organelle = kb.named("organelle");
        let cell = kb.named("cell");
        let precursor = kb.named("precursor");
        let in_cell = kb.some_values_from(part_of, cell);
        let from_precursor = kb.some_values_from(develops_from, precursor);
        kb.assert_axiom(Axiom::SubClassOf { sub: nucleus, sup: organelle });
        kb.assert_axiom(Axiom::SubClassOf { sub: nucleus, sup: in_cell });
        kb.assert_axiom(Axiom::SubClassOf { sub: nucleus, sup: from_precursor });

        let engine = engine(&kb);
        let over_part = engine
            .ancestors_over(&kb, nucleus, &[part_of], false)
            .unwrap();
        assert!(over_part.contains(&organelle));
        assert!(over_part.contains(&cell));
        assert!(!over_part.contains(&precursor));

        let strict = engine.ancestors_over(&kb, nucleus, &[part_of], true).unwrap();
        assert!(!strict.contains(&organelle));
        assert!(strict.contains(&cell));
    }

    #[test]
    fn named_projections_drop_expression_nodes() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let nucleus = kb.named("nucleus");
        let cell = kb.named("cell");
        let in_cell = kb.some_values_from(part_of, cell);
        kb.assert_axiom(Axiom::SubClassOf { sub: nucleus, sup: in_cell });

        let engine = engine(&kb);
        let all = engine.ancestors(&kb, nucleus).unwrap();
        assert!(all.contains(&in_cell));
        let named = engine.named_ancestors(&kb, nucleus).unwrap();
        assert_eq!(named, vec![cell]);
    }

    #[test]
    fn instances_require_a_pure_instance_path() {
        let mut kb = KnowledgeBase::new();
        let fred = kb.named("fred");
        let person = kb.named("person");
        let agent = kb.named("agent");
        kb.assert_axiom(Axiom::ClassAssertion { individual: fred, class: person });
        kb.assert_axiom(Axiom::SubClassOf { sub: person, sup: agent });

        let engine = engine(&kb);
        assert_eq!(engine.instances(&kb, person).unwrap(), vec![fred]);
        // instance-of composed over subclass is still instance-of
        assert_eq!(engine.instances(&kb, agent).unwrap(), vec![fred]);
        assert!(engine.instances(&kb, fred).unwrap().is_empty());
    }

    #[test]
    fn edges_between_picks_one_target() {
        let mut kb = KnowledgeBase::new();
        let a = kb.named("a");
        let b = kb.named("b");
        let c = kb.named("c");
        kb.assert_axiom(Axiom::SubClassOf { sub: a, sup: b });
        kb.assert_axiom(Axiom::SubClassOf { sub: b, sup: c });

        let engine = engine(&kb);
        let edges = engine.edges_between(&kb, a, c).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].distance, 2);
        assert!(engine.edges_between(&kb, c, a).unwrap().is_empty());
    }

    #[test]
    fn edge_subsumers_substitute_super_properties() {
        let mut kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let overlaps = kb.property("overlaps");
        let nucleus = kb.named("nucleus");
        let cell = kb.named("cell");
        kb.assert_axiom(Axiom::SubPropertyOf { sub: part_of, sup: overlaps });

        let engine = engine(&kb);
        let edge = Edge::new(
            nucleus,
            vec![QuantifiedRelation::PropertySome(part_of)],
            1,
            cell,
        );
        let subsumers = engine.edge_subsumers(&kb, &edge).unwrap();
        assert_eq!(subsumers.len(), 2);
        assert_eq!(subsumers[0], edge);
        assert_eq!(
            subsumers[1].relations,
            vec![QuantifiedRelation::PropertySome(overlaps)]
        );

        let plain = Edge::new(nucleus, vec![QuantifiedRelation::SubClassOf], 1, cell);
        assert_eq!(engine.edge_subsumers(&kb, &plain).unwrap(), vec![plain.clone()]);
    }

    #[test]
    fn translations_are_cached_and_interned() {
        let kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let nucleus = kb.named("nucleus");
        let cell = kb.named("cell");

        let engine = engine(&kb);
        let edge = Edge::new(
            nucleus,
            vec![QuantifiedRelation::PropertySome(part_of)],
            1,
            cell,
        );
        let first = engine.target_expression(&kb, &edge).unwrap();
        let second = engine.target_expression(&kb, &edge).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, kb.some_values_from(part_of, cell));
    }
}
