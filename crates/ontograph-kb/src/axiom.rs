//! Axiom store with node-level adjacency and property-level fact tables.
//!
//! Axioms are built programmatically (no file formats here) and indexed two
//! ways: class-level axioms by the nodes they mention, so edge seeding walks
//! only relevant rows, and property-level axioms into flat tables the
//! hierarchy index reads directly. A revision counter is bumped on every
//! mutation; engine snapshots compare against it to detect staleness.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::symbol::SymbolId;

/// A single logical statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axiom {
    SubClassOf {
        sub: NodeId,
        sup: NodeId,
    },
    /// N-ary equivalence; seeding treats it pairwise in both directions.
    EquivalentClasses {
        operands: Vec<NodeId>,
    },
    ClassAssertion {
        individual: NodeId,
        class: NodeId,
    },
    PropertyAssertion {
        subject: NodeId,
        property: SymbolId,
        object: NodeId,
    },
    SubPropertyOf {
        sub: SymbolId,
        sup: SymbolId,
    },
    TransitiveProperty(SymbolId),
    InverseProperties(SymbolId, SymbolId),
    /// Following `chain` in order entails following `implies`.
    PropertyChain {
        chain: Vec<SymbolId>,
        implies: SymbolId,
    },
}

impl Axiom {
    /// True for axioms about properties rather than class-level nodes.
    pub fn is_property_axiom(&self) -> bool {
        matches!(
            self,
            Axiom::SubPropertyOf { .. }
                | Axiom::TransitiveProperty(_)
                | Axiom::InverseProperties(_, _)
                | Axiom::PropertyChain { .. }
        )
    }

    /// Node IDs this axiom mentions (empty for property axioms).
    pub fn node_refs(&self) -> Vec<NodeId> {
        match self {
            Axiom::SubClassOf { sub, sup } => vec![*sub, *sup],
            Axiom::EquivalentClasses { operands } => operands.clone(),
            Axiom::ClassAssertion { individual, class } => vec![*individual, *class],
            Axiom::PropertyAssertion {
                subject, object, ..
            } => vec![*subject, *object],
            _ => Vec::new(),
        }
    }

    /// Property symbols this axiom mentions.
    pub fn property_refs(&self) -> Vec<SymbolId> {
        match self {
            Axiom::PropertyAssertion { property, .. } => vec![*property],
            Axiom::SubPropertyOf { sub, sup } => vec![*sub, *sup],
            Axiom::TransitiveProperty(p) => vec![*p],
            Axiom::InverseProperties(p, q) => vec![*p, *q],
            Axiom::PropertyChain { chain, implies } => {
                let mut out = chain.clone();
                out.push(*implies);
                out
            }
            _ => Vec::new(),
        }
    }
}

/// Indexed axiom storage for one knowledge-base snapshot.
#[derive(Debug, Default)]
pub struct AxiomStore {
    /// All axioms, in assertion order
    axioms: Vec<Axiom>,
    /// Dedup guard
    present: AHashSet<Axiom>,
    /// Class-level axioms by subject node (sub / individual / assertion subject;
    /// every operand of an equivalence)
    by_subject: AHashMap<NodeId, Vec<u32>>,
    /// Class-level axioms by object node (sup / class / assertion object;
    /// every operand of an equivalence)
    by_object: AHashMap<NodeId, Vec<u32>>,
    /// Direct super-properties per property
    super_properties: AHashMap<SymbolId, Vec<SymbolId>>,
    /// Direct sub-properties per property
    sub_properties: AHashMap<SymbolId, Vec<SymbolId>>,
    /// Properties declared transitive
    transitive: AHashSet<SymbolId>,
    /// Declared inverse pairs, both orientations
    inverses: AHashSet<(SymbolId, SymbolId)>,
    /// Declared property chains
    chains: Vec<(Vec<SymbolId>, SymbolId)>,
    /// Every property symbol mentioned by an axiom
    properties: AHashSet<SymbolId>,
    /// Mutation counter; snapshots compare against it
    revision: u64,
}

impl AxiomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of axioms stored.
    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }

    /// Assert an axiom. Returns false (and leaves the revision untouched) if
    /// the identical axiom is already present.
    pub fn assert(&mut self, axiom: Axiom) -> bool {
        if self.present.contains(&axiom) {
            return false;
        }
        let index = self.axioms.len() as u32;
        self.index_axiom(index, &axiom);
        self.present.insert(axiom.clone());
        self.axioms.push(axiom);
        self.revision += 1;
        true
    }

    /// Retract an axiom. Returns false if it was not present. Retraction
    /// rebuilds the indexes; it is expected to be rare relative to queries.
    pub fn retract(&mut self, axiom: &Axiom) -> bool {
        if !self.present.remove(axiom) {
            return false;
        }
        let Some(pos) = self.axioms.iter().position(|a| a == axiom) else {
            return false;
        };
        self.axioms.remove(pos);
        self.rebuild_indexes();
        self.revision += 1;
        true
    }

    /// All axioms, in assertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Axiom> {
        self.axioms.iter()
    }

    /// Class-level axioms whose subject is `node`.
    pub fn axioms_from(&self, node: NodeId) -> impl Iterator<Item = &Axiom> {
        self.by_subject
            .get(&node)
            .into_iter()
            .flatten()
            .map(move |&i| &self.axioms[i as usize])
    }

    /// Class-level axioms whose object is `node`.
    pub fn axioms_to(&self, node: NodeId) -> impl Iterator<Item = &Axiom> {
        self.by_object
            .get(&node)
            .into_iter()
            .flatten()
            .map(move |&i| &self.axioms[i as usize])
    }

    /// Direct super-properties of `property` (declared, not closed).
    pub fn direct_super_properties(&self, property: SymbolId) -> &[SymbolId] {
        self.super_properties
            .get(&property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct sub-properties of `property` (declared, not closed).
    pub fn direct_sub_properties(&self, property: SymbolId) -> &[SymbolId] {
        self.sub_properties
            .get(&property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_transitive(&self, property: SymbolId) -> bool {
        self.transitive.contains(&property)
    }

    pub fn are_inverse(&self, p: SymbolId, q: SymbolId) -> bool {
        self.inverses.contains(&(p, q))
    }

    /// Declared property chains, in assertion order.
    pub fn property_chains(&self) -> &[(Vec<SymbolId>, SymbolId)] {
        &self.chains
    }

    /// Every property symbol any axiom mentions.
    pub fn properties(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.properties.iter().copied()
    }

    fn index_axiom(&mut self, index: u32, axiom: &Axiom) {
        match axiom {
            Axiom::SubClassOf { sub, sup } => {
                self.by_subject.entry(*sub).or_default().push(index);
                self.by_object.entry(*sup).or_default().push(index);
            }
            Axiom::EquivalentClasses { operands } => {
                for op in operands {
                    self.by_subject.entry(*op).or_default().push(index);
                    self.by_object.entry(*op).or_default().push(index);
                }
            }
            Axiom::ClassAssertion { individual, class } => {
                self.by_subject.entry(*individual).or_default().push(index);
                self.by_object.entry(*class).or_default().push(index);
            }
            Axiom::PropertyAssertion {
                subject, object, ..
            } => {
                self.by_subject.entry(*subject).or_default().push(index);
                self.by_object.entry(*object).or_default().push(index);
            }
            Axiom::SubPropertyOf { sub, sup } => {
                self.super_properties.entry(*sub).or_default().push(*sup);
                self.sub_properties.entry(*sup).or_default().push(*sub);
            }
            Axiom::TransitiveProperty(p) => {
                self.transitive.insert(*p);
            }
            Axiom::InverseProperties(p, q) => {
                self.inverses.insert((*p, *q));
                self.inverses.insert((*q, *p));
            }
            Axiom::PropertyChain { chain, implies } => {
                self.chains.push((chain.clone(), *implies));
            }
        }
        for p in axiom.property_refs() {
            self.properties.insert(p);
        }
    }

    fn rebuild_indexes(&mut self) {
        self.by_subject.clear();
        self.by_object.clear();
        self.super_properties.clear();
        self.sub_properties.clear();
        self.transitive.clear();
        self.inverses.clear();
        self.chains.clear();
        self.properties.clear();
        let axioms = std::mem::take(&mut self.axioms);
        for (i, axiom) in axioms.iter().enumerate() {
            self.index_axiom(i as u32, axiom);
        }
        self.axioms = axioms;
    }
}
