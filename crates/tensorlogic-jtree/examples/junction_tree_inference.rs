//! Junction tree exact inference example.
//!
//! This example demonstrates the junction tree algorithm for exact probabilistic inference.
//! We'll use a classic "Student Network" Bayesian network to show how junction trees
//! provide exact marginal probabilities efficiently.
//!
//! # Network Structure
//!
//! ```text
//!     Difficulty
//!         |
//!         v
//!      Grade  <--- Intelligence
//!         |
//!         v
//!      Letter
//! ```
//!
//! This example shows:
//! 1. Building a factor graph from a Bayesian network
//! 2. Bounding the treewidth before construction
//! 3. Constructing and calibrating a junction tree with both schedules
//! 4. Querying marginals, a joint marginal across cliques and the MAP state
//!
//! Run with `RUST_LOG=debug` to see the construction and calibration logs.

use tensorlogic_jtree::{
    bound_treewidth, EliminationHeuristic, Factor, FactorGraph, InferenceType, JTreeProperties,
    JunctionTree, Node, NodeId, NodeSet, UpdateType,
};

const INTELLIGENCE: u32 = 0;
const DIFFICULTY: u32 = 1;
const GRADE: u32 = 2;
const LETTER: u32 = 3;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Junction Tree Exact Inference Example ===\n");

    let graph = build_student_network()?;
    println!("Factor Graph Statistics:");
    println!("  Variables: {}", graph.num_variables());
    println!("  Factors: {}", graph.num_factors());
    println!();

    println!("Treewidth bounds:");
    for heuristic in EliminationHeuristic::ALL {
        let (width, states) = bound_treewidth(&graph, heuristic, 0)?;
        println!("  {:<16} width {} / largest clique {} states", heuristic, width, states);
    }
    println!();

    let props = JTreeProperties::new(UpdateType::Hugin);
    println!("Constructing junction tree with {}", props);
    let mut tree = JunctionTree::from_factor_graph(&graph, props)?;

    println!("Junction Tree Structure:");
    println!("  Number of cliques: {}", tree.regions().nr_outer());
    println!("  Number of separators: {}", tree.regions().nr_inner());
    println!("  Treewidth: {}", tree.treewidth());
    for (i, clique) in tree.cliques().iter().enumerate() {
        println!("  Clique {}: {}", i, clique);
    }
    println!(
        "  Running Intersection Property: {}",
        if tree.verify_running_intersection_property() {
            "satisfied"
        } else {
            "violated"
        }
    );
    println!();

    tree.run()?;
    println!("=== Marginal Queries ===\n");
    let labels = [
        (INTELLIGENCE, "Intelligence", &["Low", "High"][..]),
        (DIFFICULTY, "Difficulty", &["Easy", "Hard"][..]),
        (GRADE, "Grade", &["A", "B", "C"][..]),
        (LETTER, "Letter", &["Weak", "Strong"][..]),
    ];
    for (id, name, states) in labels {
        let belief = tree.belief(&NodeSet::from([id]))?;
        println!("P({})", name);
        for (state, label) in states.iter().enumerate() {
            println!("  {:<7} = {:.4}", label, belief.get(&[state]).unwrap_or(0.0));
        }
    }
    println!();

    // Intelligence and Letter never share a clique
    println!("=== Joint Query Across Cliques ===\n");
    let joint = tree.calc_marginal(&NodeSet::from([INTELLIGENCE, LETTER]))?;
    for (i, intelligence) in ["Low", "High"].iter().enumerate() {
        for (l, letter) in ["Weak", "Strong"].iter().enumerate() {
            println!(
                "  P(Intelligence={:<4}, Letter={:<6}) = {:.4}",
                intelligence,
                letter,
                joint.get(&[i, l]).unwrap_or(0.0)
            );
        }
    }
    println!();

    // Evidence: a strong letter
    println!("=== Evidence: Letter = Strong ===\n");
    let mut evidence = graph.clone();
    evidence.add_factor(Factor::indicator(NodeId(LETTER), 2, 1)?)?;
    let props = JTreeProperties::new(UpdateType::ShaferShenoy);
    let mut conditioned = JunctionTree::from_factor_graph(&evidence, props)?;
    conditioned.run()?;
    let smart = conditioned.belief(&NodeSet::from([INTELLIGENCE]))?;
    println!(
        "  P(Intelligence=High | Letter=Strong) = {:.4}",
        smart.get(&[1]).unwrap_or(0.0)
    );
    println!(
        "  P(Letter=Strong) = {:.4}",
        conditioned.log_z()?.exp()
    );
    println!();

    println!("=== Most Probable Explanation ===\n");
    let props = JTreeProperties::default().with_inference(InferenceType::MaxProduct);
    let mut map = JunctionTree::from_factor_graph(&evidence, props)?;
    map.run()?;
    for (id, state) in map.find_maximum()? {
        let (_, name, states) = labels[id.0 as usize];
        println!("  {:<12} = {}", name, states[state]);
    }
    println!();

    println!("Example completed successfully!");
    Ok(())
}

/// Build the Student Network factor graph.
///
/// # Network Description
///
/// - **Intelligence**: Prior probability of student intelligence (Low/High)
/// - **Difficulty**: Prior probability of course difficulty (Easy/Hard)
/// - **Grade**: Student's grade depends on Intelligence and Difficulty (A/B/C)
/// - **Letter**: Recommendation letter quality depends on Grade (Weak/Strong)
fn build_student_network() -> anyhow::Result<FactorGraph> {
    let mut graph = FactorGraph::new();

    graph.add_node(Node::discrete(INTELLIGENCE, 2)?);
    graph.add_node(Node::discrete(DIFFICULTY, 2)?);
    graph.add_node(Node::discrete(GRADE, 3)?);
    graph.add_node(Node::discrete(LETTER, 2)?);

    // P(Intelligence): [Low, High] = [0.7, 0.3]
    graph.add_factor(Factor::from_vec(
        NodeSet::from([INTELLIGENCE]),
        &[2],
        vec![0.7, 0.3],
    )?)?;

    // P(Difficulty): [Easy, Hard] = [0.6, 0.4]
    graph.add_factor(Factor::from_vec(
        NodeSet::from([DIFFICULTY]),
        &[2],
        vec![0.6, 0.4],
    )?)?;

    // P(Grade | Intelligence, Difficulty), axes (Intelligence, Difficulty, Grade)
    #[rustfmt::skip]
    let grade_values = vec![
        // Intelligence=Low
        0.3, 0.4, 0.3,    // Difficulty=Easy  -> [A, B, C]
        0.05, 0.25, 0.7,  // Difficulty=Hard  -> [A, B, C]
        // Intelligence=High
        0.9, 0.08, 0.02,  // Difficulty=Easy  -> [A, B, C]
        0.5, 0.3, 0.2,    // Difficulty=Hard  -> [A, B, C]
    ];
    graph.add_factor(Factor::from_vec(
        NodeSet::from([INTELLIGENCE, DIFFICULTY, GRADE]),
        &[2, 2, 3],
        grade_values,
    )?)?;

    // P(Letter | Grade), axes (Grade, Letter)
    graph.add_factor(Factor::from_vec(
        NodeSet::from([GRADE, LETTER]),
        &[3, 2],
        vec![
            0.1, 0.9, // Grade=A -> [Weak, Strong]
            0.4, 0.6, // Grade=B -> [Weak, Strong]
            0.99, 0.01, // Grade=C -> [Weak, Strong]
        ],
    )?)?;

    Ok(graph)
}
