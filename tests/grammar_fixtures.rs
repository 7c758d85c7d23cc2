//! Loading the grammar fixtures under `tests/fixtures`

use grameval::analysis::analyze;
use grameval::grammar::{load, Grammar, START_SYMBOL};
use rstest::rstest;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> Grammar {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let text = fs::read_to_string(&path).expect("fixture to exist");
    load(&text).expect("fixture to load")
}

#[rstest]
#[case::shapes("shapes.pcfg")]
#[case::recursive("recursive.pcfg")]
#[case::exponents("exponents.pcfg")]
fn fixtures_are_normalized(#[case] name: &str) {
    let grammar = fixture(name);
    assert_eq!(grammar.normalization_issues(1e-6), vec![]);
    assert_eq!(grammar.start(), START_SYMBOL);
}

#[rstest]
#[case::shapes("shapes.pcfg")]
#[case::recursive("recursive.pcfg")]
#[case::exponents("exponents.pcfg")]
fn fixtures_survive_rendering(#[case] name: &str) {
    let grammar = fixture(name);
    let reloaded = load(&grammar.to_string()).expect("rendered grammar to load");
    assert_eq!(reloaded.productions(), grammar.productions());
}

#[test]
fn shapes_inventory() {
    let grammar = fixture("shapes.pcfg");
    let stats = analyze(&grammar);

    assert_eq!(stats.terminals, 8);
    assert_eq!(stats.preterminals, 5);
    assert_eq!(stats.recursive, 0);
    assert!(grammar.preterminals().contains("TOP"));
    assert!(stats.log2_prior().is_some_and(|prior| prior > 0.0));
}

#[test]
fn recursive_rules_are_counted() {
    let stats = analyze(&fixture("recursive.pcfg"));
    assert_eq!(stats.recursive, 1);
}
