//! End-to-end tests for the antichain inclusion checker
//!
//! Soundness is cross-checked against a small model-based membership
//! oracle: for languages over the bounded tree shapes used here, the
//! checker's verdict must agree with explicit tree enumeration.

use symta::{check_inclusion, union, BuTreeAutomaton, Context, State, VarAssignment};

fn asgn(s: &str) -> VarAssignment {
    s.parse().unwrap()
}

fn sym_a() -> VarAssignment {
    asgn("0000")
}

fn sym_b() -> VarAssignment {
    asgn("1111")
}

fn sym_c() -> VarAssignment {
    asgn("0101")
}

/// Trees over the test alphabet: the leaves `a`, `b` and the binary `c`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Tree {
    A,
    B,
    C(Box<Tree>, Box<Tree>),
}

/// All trees up to the given height, for the model-based oracle.
fn trees_up_to(height: usize) -> Vec<Tree> {
    let mut trees = vec![Tree::A, Tree::B];
    if height == 0 {
        return trees;
    }
    let smaller = trees_up_to(height - 1);
    for left in &smaller {
        for right in &smaller {
            trees.push(Tree::C(Box::new(left.clone()), Box::new(right.clone())));
        }
    }
    trees
}

/// The states a tree evaluates to, bottom-up.
fn run(aut: &BuTreeAutomaton, tree: &Tree) -> Vec<State> {
    match tree {
        Tree::A => aut.get_transition(&[], &sym_a()).unwrap().states().to_vec(),
        Tree::B => aut.get_transition(&[], &sym_b()).unwrap().states().to_vec(),
        Tree::C(left, right) => {
            let mut states = Vec::new();
            for &l in &run(aut, left) {
                for &r in &run(aut, right) {
                    for s in aut.get_transition(&[l, r], &sym_c()).unwrap().iter() {
                        if !states.contains(&s) {
                            states.push(s);
                        }
                    }
                }
            }
            states
        }
    }
}

fn accepts(aut: &BuTreeAutomaton, tree: &Tree) -> bool {
    run(aut, tree).iter().any(|&q| aut.is_final(q))
}

/// Oracle: language inclusion over all trees up to the given height.
fn included_up_to(a: &BuTreeAutomaton, b: &BuTreeAutomaton, height: usize) -> bool {
    trees_up_to(height)
        .iter()
        .all(|tree| !accepts(a, tree) || accepts(b, tree))
}

fn leaf_automaton(ctx: &Context, symbols: &[VarAssignment]) -> BuTreeAutomaton {
    let mut aut = BuTreeAutomaton::new(ctx);
    let q = aut.add_state();
    for symbol in symbols {
        aut.add_transition(&[], symbol, &[q]).unwrap();
    }
    aut.set_final(q).unwrap();
    aut
}

#[test]
fn inclusion_on_leaf_languages() {
    let ctx = Context::new(4);
    let a = leaf_automaton(&ctx, &[sym_a()]);
    let ab = leaf_automaton(&ctx, &[sym_a(), sym_b()]);

    assert!(check_inclusion(&a, &ab).unwrap());
    assert!(!check_inclusion(&ab, &a).unwrap());

    assert!(included_up_to(&a, &ab, 2));
    assert!(!included_up_to(&ab, &a, 2));
}

#[test]
fn inclusion_through_binary_symbols() {
    let ctx = Context::new(4);

    // accepts c(x, y) for x, y in {a}.
    let mut narrow = BuTreeAutomaton::new(&ctx);
    let n0 = narrow.add_state();
    let n1 = narrow.add_state();
    narrow.add_transition(&[], &sym_a(), &[n0]).unwrap();
    narrow.add_transition(&[n0, n0], &sym_c(), &[n1]).unwrap();
    narrow.set_final(n1).unwrap();

    // accepts c(x, y) for x, y in {a, b}.
    let mut wide = BuTreeAutomaton::new(&ctx);
    let w0 = wide.add_state();
    let w1 = wide.add_state();
    wide.add_transition(&[], &sym_a(), &[w0]).unwrap();
    wide.add_transition(&[], &sym_b(), &[w0]).unwrap();
    wide.add_transition(&[w0, w0], &sym_c(), &[w1]).unwrap();
    wide.set_final(w1).unwrap();

    assert!(check_inclusion(&narrow, &wide).unwrap());
    assert!(!check_inclusion(&wide, &narrow).unwrap());

    assert!(included_up_to(&narrow, &wide, 2));
    assert!(!included_up_to(&wide, &narrow, 2));
}

#[test]
fn inclusion_needs_a_union_of_big_states() {
    let ctx = Context::new(4);

    // One automaton accepting {a, b} with a single state.
    let both = leaf_automaton(&ctx, &[sym_a(), sym_b()]);

    // Another accepting {a, b} split across two final states: neither big
    // state covers the small one alone, their union does.
    let mut split = BuTreeAutomaton::new(&ctx);
    let sa = split.add_state();
    let sb = split.add_state();
    split.add_transition(&[], &sym_a(), &[sa]).unwrap();
    split.add_transition(&[], &sym_b(), &[sb]).unwrap();
    split.set_final(sa).unwrap();
    split.set_final(sb).unwrap();

    assert!(check_inclusion(&both, &split).unwrap());
    assert!(check_inclusion(&split, &both).unwrap());
}

#[test]
fn inclusion_rejects_a_missing_subtree() {
    let ctx = Context::new(4);

    // accepts c(a, b) only.
    let mut left = BuTreeAutomaton::new(&ctx);
    let la = left.add_state();
    let lb = left.add_state();
    let lf = left.add_state();
    left.add_transition(&[], &sym_a(), &[la]).unwrap();
    left.add_transition(&[], &sym_b(), &[lb]).unwrap();
    left.add_transition(&[la, lb], &sym_c(), &[lf]).unwrap();
    left.set_final(lf).unwrap();

    // accepts c(a, a) only.
    let mut right = BuTreeAutomaton::new(&ctx);
    let ra = right.add_state();
    let rf = right.add_state();
    right.add_transition(&[], &sym_a(), &[ra]).unwrap();
    right.add_transition(&[ra, ra], &sym_c(), &[rf]).unwrap();
    right.set_final(rf).unwrap();

    assert!(!check_inclusion(&left, &right).unwrap());
    assert!(!check_inclusion(&right, &left).unwrap());
    assert!(!included_up_to(&left, &right, 2));
    assert!(!included_up_to(&right, &left, 2));
}

#[test]
fn inclusion_agrees_with_the_oracle_on_nested_languages() {
    let ctx = Context::new(4);

    // accepts a and c(a, a), c(a, c(a, a)), ...: right-nested combs of a.
    let mut comb = BuTreeAutomaton::new(&ctx);
    let c0 = comb.add_state();
    comb.add_transition(&[], &sym_a(), &[c0]).unwrap();
    comb.add_transition(&[c0, c0], &sym_c(), &[c0]).unwrap();
    comb.set_final(c0).unwrap();

    // accepts every tree over {a, b, c}.
    let mut full = BuTreeAutomaton::new(&ctx);
    let f0 = full.add_state();
    full.add_transition(&[], &sym_a(), &[f0]).unwrap();
    full.add_transition(&[], &sym_b(), &[f0]).unwrap();
    full.add_transition(&[f0, f0], &sym_c(), &[f0]).unwrap();
    full.set_final(f0).unwrap();

    assert!(check_inclusion(&comb, &full).unwrap());
    assert!(!check_inclusion(&full, &comb).unwrap());
    assert!(included_up_to(&comb, &full, 3));
    assert!(!included_up_to(&full, &comb, 3));

    // The union of both equals the full language.
    let merged = union(&comb, &full).unwrap();
    assert!(check_inclusion(&merged, &full).unwrap());
    assert!(check_inclusion(&full, &merged).unwrap());
}

#[test]
fn inclusion_of_empty_language_holds_everywhere() {
    let ctx = Context::new(4);

    // No final state: the empty language.
    let mut empty = BuTreeAutomaton::new(&ctx);
    let e0 = empty.add_state();
    empty.add_transition(&[], &sym_a(), &[e0]).unwrap();

    let something = leaf_automaton(&ctx, &[sym_b()]);

    assert!(check_inclusion(&empty, &something).unwrap());
    assert!(!check_inclusion(&something, &empty).unwrap());
}
