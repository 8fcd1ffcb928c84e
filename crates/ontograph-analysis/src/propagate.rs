//! Rule-driven annotation propagation.
//!
//! An assignment ties an external subject (a gene product, a specimen, any
//! identifier interned as a symbol) to a class. Propagation rules push those
//! assignments up the closure: an assignment to `c` also holds for every
//! named ancestor of `c` reached purely through the rule's properties, with
//! at least one quantified step, optionally fenced to ancestors lying under a
//! root class. Asserted assignments are never re-derived.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ontograph_closure::ClosureEngine;
use ontograph_kb::{KnowledgeBase, NodeId, SymbolId};

use crate::AnalysisError;

/// One subject-to-class annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub subject: SymbolId,
    pub class: NodeId,
}

impl Assignment {
    pub fn new(subject: SymbolId, class: NodeId) -> Self {
        Self { subject, class }
    }
}

/// Which quantified steps an assignment may travel over, and where the
/// derived class must lie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationRule {
    /// Properties a path may quantify over.
    pub properties: Vec<SymbolId>,
    /// When set, derived classes must have this node among their reflexive
    /// ancestors.
    pub root: Option<NodeId>,
}

impl PropagationRule {
    pub fn over(properties: Vec<SymbolId>) -> Self {
        Self {
            properties,
            root: None,
        }
    }

    pub fn under(mut self, root: NodeId) -> Self {
        self.root = Some(root);
        self
    }
}

/// Derive the assignments the rules entail beyond the asserted ones, in
/// first-derivation order.
pub fn propagate(
    kb: &KnowledgeBase,
    engine: &ClosureEngine,
    assignments: &[Assignment],
    rules: &[PropagationRule],
) -> Result<Vec<Assignment>, AnalysisError> {
    let mut seen: AHashSet<Assignment> = assignments.iter().cloned().collect();
    let mut inferred = Vec::new();

    for assignment in assignments {
        for rule in rules {
            let reached = engine.ancestors_over(kb, assignment.class, &rule.properties, true)?;
            for ancestor in reached {
                let is_named = kb.node(ancestor).is_some_and(|n| n.is_named());
                if !is_named {
                    continue;
                }
                if let Some(root) = rule.root {
                    let under = ancestor == root
                        || engine.ancestor_set(kb, ancestor)?.contains(root.raw());
                    if !under {
                        continue;
                    }
                }
                let derived = Assignment::new(assignment.subject, ancestor);
                if seen.insert(derived.clone()) {
                    inferred.push(derived);
                }
            }
        }
    }

    debug!(
        asserted = assignments.len(),
        rules = rules.len(),
        inferred = inferred.len(),
        "propagated annotations"
    );
    Ok(inferred)
}
