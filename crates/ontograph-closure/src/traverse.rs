//! Cycle-safe closure traversal.
//!
//! Reachability over the seed table is computed with an explicit work-list
//! rather than recursion, so cyclic axiom sets (mutual subclassing, unions
//! mentioning their own ancestors) terminate. Each query starts from a
//! zero-distance identity edge on the root and repeatedly joins popped edges
//! against the seed rows of their far endpoint. A node is expanded at most
//! once per query: edges reaching an already-expanded endpoint are still
//! recorded as alternative derivations, just not followed again, which bounds
//! the expansion count by the number of reachable nodes.
//!
//! Joining concatenates the two relation lists and renormalizes them through
//! [`reduce_list`](crate::compose::reduce_list), so a derived edge always
//! carries the shortest relation sequence the composition table can justify.

use ahash::{AHashMap, AHashSet};
use roaring::RoaringBitmap;
use std::collections::VecDeque;
use tracing::trace;

use ontograph_kb::{KnowledgeBase, NodeId};

use crate::compose::{reduce_list, TieBreak};
use crate::engine::EngineConfig;
use crate::hierarchy::PropertyHierarchyIndex;
use crate::relation::Edge;
use crate::seed::SeedIndex;
use crate::EngineError;

/// One node's derived reachability set.
///
/// Every edge shares the query root on one side; the other side (target for
/// outgoing queries, source for incoming) is the *endpoint*, and edges are
/// indexed by it. Edge identity ignores distance, so at most one edge per
/// (root, relations, endpoint) triple is kept, the first and therefore
/// shortest derivation.
#[derive(Debug, Clone)]
pub struct Closure {
    root: NodeId,
    edges: Vec<Edge>,
    by_endpoint: AHashMap<NodeId, Vec<u32>>,
    endpoints: RoaringBitmap,
}

impl Closure {
    fn new(root: NodeId) -> Self {
        Self {
            root,
            edges: Vec::new(),
            by_endpoint: AHashMap::new(),
            endpoints: RoaringBitmap::new(),
        }
    }

    fn insert(&mut self, endpoint: NodeId, edge: Edge) {
        let index = self.edges.len() as u32;
        self.by_endpoint.entry(endpoint).or_default().push(index);
        self.endpoints.insert(endpoint.raw());
        self.edges.push(edge);
    }

    /// The node the query started from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// All derived edges, in discovery order (nondecreasing distance).
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether `node` is a far endpoint of any derived edge.
    pub fn contains(&self, node: NodeId) -> bool {
        self.endpoints.contains(node.raw())
    }

    /// Every derived edge whose far endpoint is `node`.
    pub fn edges_with(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.by_endpoint
            .get(&node)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i as usize])
    }

    /// Set projection of the far endpoints.
    pub fn endpoint_set(&self) -> &RoaringBitmap {
        &self.endpoints
    }

    /// Far endpoints as node IDs.
    pub fn endpoints(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.endpoints.iter().map(NodeId::new)
    }
}

/// Derived edges out of `root`. With `reflexive` the zero-distance identity
/// edge on the root is included in the result.
pub fn outgoing_closure(
    kb: &KnowledgeBase,
    seeds: &SeedIndex,
    index: &PropertyHierarchyIndex,
    config: &EngineConfig,
    root: NodeId,
    reflexive: bool,
) -> Result<Closure, EngineError> {
    let mut closure = Closure::new(root);
    let mut recorded: AHashSet<Edge> = AHashSet::new();
    let mut visited = RoaringBitmap::new();
    let mut worklist: VecDeque<Edge> = VecDeque::new();
    worklist.push_back(Edge::identity(root));
    if reflexive {
        let seed = Edge::identity(root);
        recorded.insert(seed.clone());
        closure.insert(root, seed);
    }

    let mut expansions: usize = 0;
    while let Some(edge) = worklist.pop_front() {
        if visited.contains(edge.target.raw()) {
            continue;
        }
        visited.insert(edge.target.raw());
        expansions += 1;
        if expansions > config.worklist_limit {
            return Err(EngineError::ClosureAborted {
                node: kb.render(root),
                limit: config.worklist_limit,
            });
        }
        for step in seeds.outgoing_with_structure(kb, edge.target).iter() {
            let merged = join(&edge, step, index, config.tie_break);
            if config.is_excluded_edge(kb, &merged) {
                continue;
            }
            if recorded.insert(merged.clone()) {
                closure.insert(merged.target, merged.clone());
            }
            worklist.push_back(merged);
        }
    }

    trace!(
        root = root.raw(),
        edges = closure.edge_count(),
        expanded = visited.len(),
        "outgoing closure complete"
    );
    Ok(closure)
}

/// Derived edges into `root`, the mirror image of [`outgoing_closure`]:
/// popped edges are extended backwards through the seed rows targeting their
/// source, and expansion is once per source.
pub fn incoming_closure(
    kb: &KnowledgeBase,
    seeds: &SeedIndex,
    index: &PropertyHierarchyIndex,
    config: &EngineConfig,
    root: NodeId,
    reflexive: bool,
) -> Result<Closure, EngineError> {
    let mut closure = Closure::new(root);
    let mut recorded: AHashSet<Edge> = AHashSet::new();
    let mut visited = RoaringBitmap::new();
    let mut worklist: VecDeque<Edge> = VecDeque::new();
    worklist.push_back(Edge::identity(root));
    if reflexive {
        let seed = Edge::identity(root);
        recorded.insert(seed.clone());
        closure.insert(root, seed);
    }

    let mut expansions: usize = 0;
    while let Some(edge) = worklist.pop_front() {
        if visited.contains(edge.source.raw()) {
            continue;
        }
        visited.insert(edge.source.raw());
        expansions += 1;
        if expansions > config.worklist_limit {
            return Err(EngineError::ClosureAborted {
                node: kb.render(root),
                limit: config.worklist_limit,
            });
        }
        for step in seeds.incoming_with_structure(kb, edge.source).iter() {
            let merged = join(step, &edge, index, config.tie_break);
            if config.is_excluded_edge(kb, &merged) {
                continue;
            }
            if recorded.insert(merged.clone()) {
                closure.insert(merged.source, merged.clone());
            }
            worklist.push_back(merged);
        }
    }

    trace!(
        root = root.raw(),
        edges = closure.edge_count(),
        expanded = visited.len(),
        "incoming closure complete"
    );
    Ok(closure)
}

/// Compose two adjacent edges into one: `first.source` to `second.target`,
/// relation lists concatenated and renormalized, distances summed.
fn join(first: &Edge, second: &Edge, index: &PropertyHierarchyIndex, tie: TieBreak) -> Edge {
    let mut relations = first.relations.clone();
    relations.extend(second.relations.iter().cloned());
    let relations = reduce_list(&relations, index, tie);
    Edge::new(
        first.source,
        relations,
        first.distance.saturating_add(second.distance),
        second.target,
    )
}
