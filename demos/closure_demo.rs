//! End-to-End Ontograph Demo
//!
//! Walks the full pipeline over a small cell-biology knowledge base:
//! 1. Axiom assertion and expression interning
//! 2. Closure engine build (edge seeding, property hierarchy priming)
//! 3. Reachability queries with reduced relation chains
//! 4. Edge generalization over the property hierarchy
//! 5. Analysis passes: least common subsumers, annotation propagation

use ontograph_analysis::{propagate, Assignment, PropagationRule, SubsumerAnalysis};
use ontograph_closure::{
    reduce_list, ClosureEngine, Edge, EngineConfig, QuantifiedRelation, TieBreak,
};
use ontograph_kb::{Axiom, KnowledgeBase, StructuralReasoner};

fn relation_text(kb: &KnowledgeBase, relation: &QuantifiedRelation) -> String {
    match relation {
        QuantifiedRelation::SubClassOf => "subclass_of".to_string(),
        QuantifiedRelation::InstanceOf => "instance_of".to_string(),
        QuantifiedRelation::IdenticalTo => "identical_to".to_string(),
        QuantifiedRelation::PropertySome(p) => format!("some {}", kb.render_symbol(*p)),
        QuantifiedRelation::PropertyOnly(p) => format!("only {}", kb.render_symbol(*p)),
        QuantifiedRelation::PropertyValue(p) => format!("value {}", kb.render_symbol(*p)),
        QuantifiedRelation::PropertyCardinality { property, .. } => {
            format!("card {}", kb.render_symbol(*property))
        }
    }
}

fn edge_text(kb: &KnowledgeBase, edge: &Edge) -> String {
    let chain: Vec<String> = edge
        .relations
        .iter()
        .map(|r| relation_text(kb, r))
        .collect();
    format!(
        "{} --[{}]--> {}  (distance {})",
        kb.render(edge.source),
        chain.join(", "),
        kb.render(edge.target),
        edge.distance
    )
}

fn main() -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              ONTOGRAPH END-TO-END DEMO                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    // ========================================================================
    // Step 1: Build the knowledge base
    // ========================================================================

    println!("━━━ Step 1: Building the Knowledge Base ━━━");
    println!();

    let mut kb = KnowledgeBase::new();

    let part_of = kb.property("part_of");
    let regulates = kb.property("regulates");
    let positively_regulates = kb.property("positively_regulates");
    kb.assert_axiom(Axiom::TransitiveProperty(part_of));
    kb.assert_axiom(Axiom::SubPropertyOf {
        sub: positively_regulates,
        sup: regulates,
    });
    kb.assert_axiom(Axiom::PropertyChain {
        chain: vec![regulates, part_of],
        implies: regulates,
    });

    println!("  Properties:");
    println!("    • part_of               (transitive)");
    println!("    • regulates             (regulates then part_of implies regulates)");
    println!("    • positively_regulates  (sub-property of regulates)");

    let cell_cycle = kb.named("cell_cycle");
    let mitotic_cycle = kb.named("mitotic_cell_cycle");
    let cytokinesis = kb.named("cytokinesis");
    let signaling = kb.named("mitogen_signaling");
    let observed = kb.named("observed_event_41");

    let in_mitotic = kb.some_values_from(part_of, mitotic_cycle);
    let promotes_cytokinesis = kb.some_values_from(positively_regulates, cytokinesis);
    kb.assert_axiom(Axiom::SubClassOf {
        sub: mitotic_cycle,
        sup: cell_cycle,
    });
    kb.assert_axiom(Axiom::SubClassOf {
        sub: cytokinesis,
        sup: in_mitotic,
    });
    kb.assert_axiom(Axiom::SubClassOf {
        sub: signaling,
        sup: promotes_cytokinesis,
    });
    kb.assert_axiom(Axiom::ClassAssertion {
        individual: observed,
        class: cytokinesis,
    });

    println!("  Classes:");
    println!("    • mitotic_cell_cycle, a subclass of cell_cycle");
    println!("    • cytokinesis, a subclass of {}", kb.render(in_mitotic));
    println!(
        "    • mitogen_signaling, a subclass of {}",
        kb.render(promotes_cytokinesis)
    );
    println!("  Individuals:");
    println!("    • observed_event_41 : cytokinesis");
    println!();
    println!(
        "  {} interned nodes, {} axioms",
        kb.nodes().len(),
        kb.axioms().len()
    );
    println!();

    // ========================================================================
    // Step 2: Build the closure engine
    // ========================================================================

    println!("━━━ Step 2: Building the Closure Engine ━━━");
    println!();

    let oracle = StructuralReasoner::new(&kb);
    let engine = ClosureEngine::build(&kb, &oracle, EngineConfig::default())?;

    println!(
        "  Seeded {} direct edges over {} properties",
        engine.seed_index().edge_count(),
        engine.hierarchy().property_count()
    );
    println!();

    // ========================================================================
    // Step 3: Closure queries
    // ========================================================================

    println!("━━━ Step 3: Reachability with Reduced Chains ━━━");
    println!();

    let closure = engine.closure_of(&kb, cytokinesis, false)?;
    println!("  Closure of cytokinesis ({} edges):", closure.edge_count());
    for edge in closure.edges() {
        println!("    {}", edge_text(&kb, edge));
    }
    println!();

    // The two-hop path over the transitive part_of came back as one step;
    // translate it back into a class expression.
    for edge in engine.edges_between(&kb, cytokinesis, mitotic_cycle)? {
        let expr = engine.target_expression(&kb, &edge)?;
        println!(
            "  cytokinesis reaches mitotic_cell_cycle as {}",
            kb.render(expr)
        );
    }
    println!();

    // ========================================================================
    // Step 4: Generalization over the property hierarchy
    // ========================================================================

    println!("━━━ Step 4: Edge Generalization ━━━");
    println!();

    // The declared chain names regulates itself, so the derived edge keeps
    // its exact two-step path. Substituting the super-property makes the
    // chain applicable and the path contracts.
    for edge in engine.edges_between(&kb, signaling, mitotic_cycle)? {
        println!("  Derived:     {}", edge_text(&kb, &edge));
        for general in engine.edge_subsumers(&kb, &edge)? {
            let contracted =
                reduce_list(&general.relations, engine.hierarchy(), TieBreak::default());
            let chain: Vec<String> = contracted
                .iter()
                .map(|r| relation_text(&kb, r))
                .collect();
            println!(
                "  Generalized: {}  => [{}]",
                edge_text(&kb, &general),
                chain.join(", ")
            );
        }
    }
    println!();

    // ========================================================================
    // Step 5: Individuals
    // ========================================================================

    println!("━━━ Step 5: Classifying Individuals ━━━");
    println!();

    for individual in engine.instances(&kb, cytokinesis)? {
        println!("  {} is an instance of cytokinesis", kb.render(individual));
    }
    let ancestors = engine.ancestors(&kb, observed)?;
    println!(
        "  observed_event_41 reaches {} ancestor nodes",
        ancestors.len()
    );
    println!();

    // ========================================================================
    // Step 6: Analysis passes
    // ========================================================================

    println!("━━━ Step 6: Subsumers and Propagation ━━━");
    println!();

    let analysis = SubsumerAnalysis::new();
    let lcs = analysis.least_common_subsumers(&kb, &engine, cytokinesis, mitotic_cycle)?;
    let rendered: Vec<String> = lcs.iter().map(|id| kb.render(*id)).collect();
    println!(
        "  LCS(cytokinesis, mitotic_cell_cycle) = {}",
        rendered.join(", ")
    );

    let gene = kb.symbol("gene:cdc14");
    let inferred = propagate(
        &kb,
        &engine,
        &[Assignment::new(gene, cytokinesis)],
        &[PropagationRule::over(vec![part_of])],
    )?;
    println!("  Annotation gene:cdc14 : cytokinesis propagates to:");
    for assignment in &inferred {
        println!(
            "    • {} : {}",
            kb.render_symbol(assignment.subject),
            kb.render(assignment.class)
        );
    }
    println!();

    println!("Demo complete.");
    Ok(())
}
