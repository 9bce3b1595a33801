//! Grammar and secondary slot integration tests

use fraglink_core::{EngineConfig, Grammar, HashBangCodec, Operation, Pair, PairState, UrlCodec};
use fraglink_testkit::MockSlot;
use fraglink_testkit::fixtures::*;
use proptest::prelude::*;
use rstest::*;

fn state(pairs: &[(&str, &str)]) -> PairState {
	pairs.iter().map(|(t, r)| Pair::new(*t, *r)).collect()
}

// ============================================================================
// At-inclusion grammar
// ============================================================================

#[rstest]
fn test_at_inclusion_keeps_query_string() {
	let harness = Harness::at("/docs/@main=page1.html?lang=en");
	let engine = harness.engine(EngineConfig::default().with_grammar(Grammar::AtInclusion));

	engine.start().unwrap();
	assert_eq!(harness.history.address(), "/docs/@!main=page1.html?lang=en");

	engine.set_region("footer", "f.html").unwrap();
	assert_eq!(
		harness.history.address(),
		"/docs/@!main=page1.html,!footer=f.html?lang=en"
	);

	engine.change_all("").unwrap();
	assert_eq!(harness.history.address(), "/docs?lang=en");
	assert!(engine.state().is_empty());
}

#[rstest]
fn test_at_inclusion_ignores_hash_changes() {
	let harness = Harness::at("/docs/@!main=page1.html");
	let engine = harness.engine(EngineConfig::default().with_grammar(Grammar::AtInclusion));
	engine.start().unwrap();

	harness.history.navigate("/docs/@!main=page1.html#top");

	assert_eq!(engine.state(), state(&[("main", "page1.html")]));
	assert_eq!(harness.fetcher.requests().len(), 1);
}

// ============================================================================
// Secondary slot
// ============================================================================

#[rstest]
fn test_writes_are_mirrored(harness: Harness) {
	let slot = MockSlot::new();
	let engine = harness.engine(EngineConfig::default().with_secondary_slot(true));
	engine.attach_slot(slot.clone()).unwrap();
	engine.start().unwrap();

	engine.set_region("main", "a.html").unwrap();

	assert_eq!(slot.mirrored(), vec![PAGE, "/index.html#!main=a.html"]);
}

#[rstest]
fn test_secondary_traversal_is_not_mirrored_again(harness: Harness) {
	let slot = MockSlot::new();
	let engine = harness.engine(EngineConfig::default().with_secondary_slot(true));
	engine.attach_slot(slot.clone()).unwrap();
	engine.start().unwrap();
	engine.set_region("main", "a.html").unwrap();
	engine.set_region("main", "b.html").unwrap();

	let report = engine
		.handle_secondary_traversal("/index.html#!main=a.html")
		.unwrap()
		.unwrap();

	assert_eq!(report.address.as_deref(), Some("/index.html#!main=a.html"));
	assert_eq!(engine.state(), state(&[("main", "a.html")]));
	assert_eq!(harness.history.address(), "/index.html#!main=a.html");
	assert_eq!(slot.mirrored().len(), 3);
	assert!(
		engine
			.handle_secondary_traversal("/index.html#!main=a.html")
			.unwrap()
			.is_none()
	);
}

// ============================================================================
// Property-based
// ============================================================================

const REGIONS: [&str; 2] = ["main", "footer"];

fn pair_lists() -> impl Strategy<Value = Vec<(usize, String)>> {
	prop::collection::vec((0..REGIONS.len(), "[a-z]{1,6}\\.html"), 0..4)
}

proptest! {
	/// Writing a declarative list and reading the address back is a fixed point.
	#[test]
	fn prop_canonical_address_is_a_fixed_point(raw in pair_lists()) {
		let harness = Harness::at(PAGE);
		let engine = harness.engine(EngineConfig::default());
		engine.start().unwrap();
		let wanted: PairState = raw
			.iter()
			.map(|(region, locator)| Pair::new(REGIONS[*region], locator.as_str()))
			.collect();

		engine.change_all(&HashBangCodec.encode(&wanted)).unwrap();

		prop_assert_eq!(engine.state(), wanted.clone());
		let address = harness.history.address();
		let decoded = HashBangCodec.decode_address(&address).unwrap();
		prop_assert_eq!(decoded, vec![Operation::SetAll(wanted)]);
		let fragment = HashBangCodec.extract(&address).unwrap();
		let again = engine.change_all(fragment).unwrap();
		prop_assert!(again.applied.is_empty());
		prop_assert!(again.address.is_none());
		prop_assert!(engine.handle_address_change().unwrap().is_none());
	}
}
