//! End-to-end tests for Timbuk parsing, printing and the named facade

use std::io::Write;
use symta::{Context, NamedAutomaton, SymbolDictionary};

fn workspace() -> (Context, SymbolDictionary) {
    (Context::new(16), SymbolDictionary::new(16))
}

const UNION_LHS: &str = "\
Ops a:0
Automaton one
States q0:0
Final States q0
Transitions
a -> q0
";

const UNION_RHS: &str = "\
Ops b:0
Automaton two
States r0:0
Final States r0
Transitions
b -> r0
";

#[test]
fn parse_print_reparse_is_stable() {
    let (ctx, dict) = workspace();
    let input = "\
Ops a:0 b:0 f:2
Automaton stable
States q0:0 q1:0 q2:0
Final States q2
Transitions
a -> q0
b -> q1
f(q0, q1) -> q2
f(q1, q0) -> q2
";
    let first = NamedAutomaton::from_timbuk_string(&ctx, &dict, input).unwrap();
    let printed = first.to_timbuk_string();
    let second = NamedAutomaton::from_timbuk_string(&ctx, &dict, &printed).unwrap();

    assert_eq!(printed, second.to_timbuk_string());
    assert_eq!(first.automaton().finals().len(), 1);
    assert_eq!(second.automaton().finals().len(), 1);
    assert_eq!(
        first.automaton().rules().len(),
        second.automaton().rules().len()
    );
}

#[test]
fn file_round_trip() {
    let (ctx, dict) = workspace();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(UNION_LHS.as_bytes()).unwrap();
    file.flush().unwrap();

    let parsed = NamedAutomaton::from_timbuk_file(&ctx, &dict, file.path()).unwrap();
    assert_eq!(parsed.name(), "one");

    let out = tempfile::NamedTempFile::new().unwrap();
    parsed.to_timbuk_file(out.path()).unwrap();
    let reread = NamedAutomaton::from_timbuk_file(&ctx, &dict, out.path()).unwrap();
    assert_eq!(parsed.to_timbuk_string(), reread.to_timbuk_string());
}

#[test]
fn union_via_the_facade_prints_both_rules() {
    let (ctx, dict) = workspace();
    let lhs = NamedAutomaton::from_timbuk_string(&ctx, &dict, UNION_LHS).unwrap();
    let rhs = NamedAutomaton::from_timbuk_string(&ctx, &dict, UNION_RHS).unwrap();

    let result = lhs.union(&rhs).unwrap();
    let printed = result.to_timbuk_string();

    assert!(printed.contains("Automaton one+two"));
    assert!(printed.contains("a -> q0"));
    assert!(printed.contains("b -> r0"));
    assert!(printed.contains("Final States q0 r0"));
}

#[test]
fn intersection_via_the_facade() {
    let (ctx, dict) = workspace();
    let shared = "\
Ops a:0 f:1
Automaton x
States s0:0 s1:0
Final States s1
Transitions
a -> s0
f(s0) -> s1
";
    let lhs = NamedAutomaton::from_timbuk_string(&ctx, &dict, shared).unwrap();
    // Same language, different state names.
    let rhs = NamedAutomaton::from_timbuk_string(
        &ctx,
        &dict,
        &shared.replace("s0", "t0").replace("s1", "t1").replace("Automaton x", "Automaton y"),
    )
    .unwrap();

    let product = lhs.intersection(&rhs).unwrap();
    assert_eq!(product.automaton().states().len(), 2);
    assert_eq!(product.automaton().finals().len(), 1);

    // Product states print with synthesized labels.
    let printed = product.to_timbuk_string();
    assert!(printed.contains("Automaton x&y"));
    assert!(printed.contains("a -> q"));
}

#[test]
fn simulation_via_the_facade_names_pairs() {
    let (ctx, dict) = workspace();
    let input = "\
Ops a:0 g:1
Automaton sim
States p0:0 p1:0 top:0
Final States top
Transitions
a -> p0
a -> p1
g(p0) -> top
g(p1) -> top
";
    let automaton = NamedAutomaton::from_timbuk_string(&ctx, &dict, input).unwrap();
    let sim = automaton.downward_simulation().unwrap();

    let p0 = automaton.state_named("p0").unwrap();
    let p1 = automaton.state_named("p1").unwrap();
    let top = automaton.state_named("top").unwrap();

    assert!(sim.contains(p0, p1));
    assert!(sim.contains(p1, p0));
    assert!(!sim.contains(top, p0));
    assert_eq!(automaton.label_of(p0), "p0");
    assert_eq!(automaton.label_of(top), "top");
}

#[test]
fn inclusion_via_the_facade() {
    let (ctx, dict) = workspace();
    let small = NamedAutomaton::from_timbuk_string(&ctx, &dict, UNION_LHS).unwrap();
    let big_input = "\
Ops a:0 b:0
Automaton big
States u:0
Final States u
Transitions
a -> u
b -> u
";
    let big = NamedAutomaton::from_timbuk_string(&ctx, &dict, big_input).unwrap();

    assert!(small.inclusion_in(&big).unwrap());
    assert!(!big.inclusion_in(&small).unwrap());
}

#[test]
fn symbolic_rule_expansion_lists_every_symbol() {
    let (ctx, dict) = workspace();
    // Two nullary symbols mapping to the same state share diagram paths;
    // the writer expands the shared cube back into both names.
    let input = "\
Ops a:0 b:0
Automaton shared
States q:0
Final States q
Transitions
a -> q
b -> q
";
    let automaton = NamedAutomaton::from_timbuk_string(&ctx, &dict, input).unwrap();
    let printed = automaton.to_timbuk_string();
    assert!(printed.contains("a -> q"));
    assert!(printed.contains("b -> q"));
}
