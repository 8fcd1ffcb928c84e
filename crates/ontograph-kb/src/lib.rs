//! Knowledge base model: interned expressions, axioms, reasoner seam.
//!
//! This crate owns the data the graph layer is computed from:
//!
//! 1. **Interning**: identifiers ([`SymbolId`]) and class expressions
//!    ([`NodeId`]) are deduplicated structurally, so equality is a u32
//!    compare everywhere downstream.
//! 2. **Axiom store**: class-level axioms with node adjacency, property-level
//!    facts in flat tables, and the revision counter snapshots validate
//!    against.
//! 3. **Reasoner oracle**: the trait boundary to external deduction, plus a
//!    structural default that answers from declared axioms.
//!
//! A [`KnowledgeBase`] is an explicit context object owned by the caller and
//! passed into every engine call; several can coexist and are torn down
//! independently. Shared read-only use is safe, including expression
//! interning, which takes `&self`; axiom mutation needs `&mut self` and is
//! the caller's single-writer section.

pub mod axiom;
pub mod node;
pub mod reasoner;
pub mod symbol;

pub use axiom::{Axiom, AxiomStore};
pub use node::{Node, NodeArena, NodeId};
pub use reasoner::{OracleError, ReasonerOracle, StructuralReasoner};
pub use symbol::{SymbolId, SymbolTable};

/// One loaded knowledge base: symbol table, node arena, axiom store.
pub struct KnowledgeBase {
    symbols: SymbolTable,
    nodes: NodeArena,
    axioms: AxiomStore,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            nodes: NodeArena::new(),
            axioms: AxiomStore::new(),
        }
    }

    // ========================================================================
    // Component access
    // ========================================================================

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn axioms(&self) -> &AxiomStore {
        &self.axioms
    }

    /// Current mutation counter of the axiom store.
    pub fn revision(&self) -> u64 {
        self.axioms.revision()
    }

    // ========================================================================
    // Building blocks
    // ========================================================================

    /// Intern an identifier.
    pub fn symbol(&self, text: &str) -> SymbolId {
        self.symbols.intern(text)
    }

    /// Intern a property identifier. Same table as [`Self::symbol`]; the
    /// separate name keeps call sites readable.
    pub fn property(&self, text: &str) -> SymbolId {
        self.symbols.intern(text)
    }

    /// Intern a named entity node.
    pub fn named(&self, ident: &str) -> NodeId {
        let sym = self.symbols.intern(ident);
        self.nodes.intern(Node::Named(sym))
    }

    /// Intern the named node for an already-interned symbol.
    pub fn named_node(&self, sym: SymbolId) -> NodeId {
        self.nodes.intern(Node::Named(sym))
    }

    pub fn intersection(&self, operands: Vec<NodeId>) -> NodeId {
        self.nodes.intern(Node::Intersection(operands))
    }

    pub fn union(&self, operands: Vec<NodeId>) -> NodeId {
        self.nodes.intern(Node::Union(operands))
    }

    pub fn some_values_from(&self, property: SymbolId, filler: NodeId) -> NodeId {
        self.nodes.intern(Node::SomeValuesFrom { property, filler })
    }

    pub fn only_values_from(&self, property: SymbolId, filler: NodeId) -> NodeId {
        self.nodes.intern(Node::OnlyValuesFrom { property, filler })
    }

    /// Shape of an interned node.
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(id)
    }

    // ========================================================================
    // Axiom mutation (single-writer section)
    // ========================================================================

    /// Assert an axiom; returns false on duplicates. Bumps the revision, so
    /// existing engine snapshots report themselves stale until rebuilt.
    pub fn assert_axiom(&mut self, axiom: Axiom) -> bool {
        self.axioms.assert(axiom)
    }

    /// Retract an axiom; returns false if absent. Bumps the revision.
    pub fn retract_axiom(&mut self, axiom: &Axiom) -> bool {
        self.axioms.retract(axiom)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Stable human-readable form of a node, for logs and error payloads.
    pub fn render(&self, id: NodeId) -> String {
        let Some(node) = self.nodes.get(id) else {
            return format!("#{}", id.raw());
        };
        match node {
            Node::Named(sym) => self.render_symbol(sym),
            Node::Intersection(ops) => self.render_operands(&ops, " and "),
            Node::Union(ops) => self.render_operands(&ops, " or "),
            Node::SomeValuesFrom { property, filler } => {
                format!(
                    "({} some {})",
                    self.render_symbol(property),
                    self.render(filler)
                )
            }
            Node::OnlyValuesFrom { property, filler } => {
                format!(
                    "({} only {})",
                    self.render_symbol(property),
                    self.render(filler)
                )
            }
        }
    }

    /// Identifier text, falling back to the raw ID for unknown symbols.
    pub fn render_symbol(&self, sym: SymbolId) -> String {
        self.symbols
            .resolve(sym)
            .unwrap_or_else(|| format!("?{}", sym.raw()))
    }

    fn render_operands(&self, operands: &[NodeId], joiner: &str) -> String {
        let parts: Vec<String> = operands.iter().map(|op| self.render(*op)).collect();
        format!("({})", parts.join(joiner))
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_intern_through() {
        let kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let cell = kb.named("cell");

        let a = kb.some_values_from(part_of, cell);
        let b = kb.some_values_from(part_of, cell);
        assert_eq!(a, b);
        assert_eq!(kb.named("cell"), cell);
    }

    #[test]
    fn render_forms() {
        let kb = KnowledgeBase::new();
        let part_of = kb.property("part_of");
        let nucleus = kb.named("nucleus");
        let cell = kb.named("cell");

        let some = kb.some_values_from(part_of, cell);
        assert_eq!(kb.render(some), "(part_of some cell)");

        let both = kb.intersection(vec![nucleus, some]);
        assert_eq!(kb.render(both), "(nucleus and (part_of some cell))");

        let either = kb.union(vec![nucleus, cell]);
        assert_eq!(kb.render(either), "(nucleus or cell)");

        assert_eq!(kb.render(NodeId::new(99)), "#99");
    }

    #[test]
    fn mutation_bumps_revision() {
        let mut kb = KnowledgeBase::new();
        let a = kb.named("a");
        let b = kb.named("b");
        assert_eq!(kb.revision(), 0);

        let ax = Axiom::SubClassOf { sub: a, sup: b };
        assert!(kb.assert_axiom(ax.clone()));
        assert_eq!(kb.revision(), 1);
        assert!(kb.retract_axiom(&ax));
        assert_eq!(kb.revision(), 2);
    }
}
