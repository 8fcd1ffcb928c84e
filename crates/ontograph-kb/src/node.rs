//! Class-expression nodes with structural interning.
//!
//! A [`Node`] is either a named entity or an anonymous compound expression
//! (intersection, union, existential or universal restriction). Compound
//! operands are stored as [`NodeId`]s, so equality and hashing are structural
//! by construction: two expressions built independently from the same parts
//! intern to the same ID. The whole graph layer depends on that invariant:
//! an expression synthesized by a consumer query must collide with the same
//! expression discovered during seeding.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::symbol::SymbolId;

/// Interned node ID. Adjacency, closures, and bitmaps all key on the raw u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A named entity or anonymous class expression.
///
/// Operand order is significant: `Intersection([a, b])` and
/// `Intersection([b, a])` are distinct nodes. Callers wanting a canonical
/// form sort operands before interning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    /// A class, individual, or property with a stable identifier.
    Named(SymbolId),
    Intersection(Vec<NodeId>),
    Union(Vec<NodeId>),
    SomeValuesFrom { property: SymbolId, filler: NodeId },
    OnlyValuesFrom { property: SymbolId, filler: NodeId },
}

impl Node {
    pub fn is_named(&self) -> bool {
        matches!(self, Node::Named(_))
    }

    /// The identifier of a named node, `None` for anonymous expressions.
    pub fn named_symbol(&self) -> Option<SymbolId> {
        match self {
            Node::Named(sym) => Some(*sym),
            _ => None,
        }
    }

    /// The property of a restriction node, `None` otherwise.
    pub fn restriction_property(&self) -> Option<SymbolId> {
        match self {
            Node::SomeValuesFrom { property, .. } | Node::OnlyValuesFrom { property, .. } => {
                Some(*property)
            }
            _ => None,
        }
    }
}

/// Structural-hash arena: every distinct expression shape is stored once.
///
/// Interning takes `&self` (queries synthesize expressions against a shared
/// knowledge base), and IDs are dense vector indexes. Because a compound can
/// only reference IDs that already exist, the stored structure is acyclic;
/// cycles arise only in the seeded *edge* graph, which the traversal layer
/// guards with a visited set.
pub struct NodeArena {
    /// Shape to ID mapping
    by_shape: DashMap<Node, NodeId>,
    /// ID to shape mapping (dense)
    by_id: RwLock<Vec<Node>>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            by_shape: DashMap::new(),
            by_id: RwLock::new(Vec::new()),
        }
    }

    /// Intern a node, returning its canonical ID.
    ///
    /// Equal shapes always return the same ID; the write lock double-checks
    /// so a racing intern cannot mint duplicates.
    pub fn intern(&self, node: Node) -> NodeId {
        if let Some(id) = self.by_shape.get(&node) {
            return *id;
        }

        let mut table = self.by_id.write();
        if let Some(id) = self.by_shape.get(&node) {
            return *id;
        }
        let id = NodeId(table.len() as u32);
        table.push(node.clone());
        self.by_shape.insert(node, id);
        id
    }

    /// Look up the shape for an ID.
    pub fn get(&self, id: NodeId) -> Option<Node> {
        self.by_id.read().get(id.raw() as usize).cloned()
    }

    /// Look up the ID for a shape without inserting.
    pub fn id_of(&self, node: &Node) -> Option<NodeId> {
        self.by_shape.get(node).map(|id| *id)
    }

    /// Number of interned nodes.
    pub fn len(&self) -> usize {
        self.by_id.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all node IDs, in interning order.
    pub fn ids(&self) -> Vec<NodeId> {
        (0..self.len() as u32).map(NodeId::new).collect()
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}
