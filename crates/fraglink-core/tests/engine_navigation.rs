//! Engine navigation integration tests
//!
//! Covers the full cycle against in-memory doubles:
//! 1. Initial load injects content and canonicalizes the address
//! 2. Replacing an ancestor cascades to nested regions
//! 3. Removing a region restores its original markup
//! 4. Back/forward adopt the level stored with each entry
//! 5. The engine's own writes never start a new cycle
//! 6. Fetch failures and missing regions degrade gracefully

use fraglink_core::{EngineConfig, FetchOutcome, Pair, PairState, RegionId};
use fraglink_testkit::fixtures::*;
use fraglink_testkit::{HistoryWrite, MockDom, MockFetcher, MockHistory, ObserverEvent, RecordingObserver};
use rstest::*;

const PAGE1_WITH_SIDE: &str = r#"<p>one</p><aside id="side"></aside>"#;

fn state(pairs: &[(&str, &str)]) -> PairState {
	pairs.iter().map(|(t, r)| Pair::new(*t, *r)).collect()
}

// ============================================================================
// Initial load
// ============================================================================

#[rstest]
fn test_initial_address_is_loaded_and_canonicalized(config: EngineConfig) {
	let harness = Harness::at("/index.html#main=page1.html");
	let engine = harness.engine(config);

	let report = engine.start().unwrap();

	assert_eq!(report.requested, vec![RegionId::new("main")]);
	assert_eq!(harness.dom.content("main").as_deref(), Some("<p>page1.html</p>"));
	assert_eq!(harness.history.address(), "/index.html#!main=page1.html");
	assert_eq!(harness.history.entry().map(|e| e.level), Some(0));
	assert_eq!(harness.history.push_count(), 0);
	assert_eq!(engine.state(), state(&[("main", "page1.html")]));
}

#[rstest]
fn test_address_without_pairs_loads_nothing(harness: Harness, config: EngineConfig) {
	let engine = harness.engine(config);

	let report = engine.start().unwrap();

	assert!(report.applied.is_empty());
	assert!(harness.fetcher.requests().is_empty());
	assert_eq!(harness.dom.content("main").as_deref(), Some(MAIN_DEFAULT));
	assert_eq!(harness.history.address(), PAGE);
}

#[rstest]
fn test_requests_carry_transport_settings() {
	let harness = Harness::at("/index.html#!main=page1.html");
	let engine = harness.engine(
		EngineConfig::default()
			.with_method("POST")
			.with_timeout(std::time::Duration::from_secs(2)),
	);

	engine.start().unwrap();

	let requests = harness.fetcher.requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].method, "POST");
	assert_eq!(requests[0].timeout, std::time::Duration::from_secs(2));
	assert!(requests[0].asynchronous);
}

// ============================================================================
// Cascades and restores
// ============================================================================

#[rstest]
fn test_replacing_ancestor_drops_nested_region(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=page1.html,!side=side1.html");
	harness.fetcher.respond_with("page1.html", PAGE1_WITH_SIDE);
	let engine = harness.engine(config);
	engine.start().unwrap();
	assert_eq!(harness.dom.content("side").as_deref(), Some("<p>side1.html</p>"));
	harness.dom.clear_injections();

	harness.history.navigate("/index.html#!main=page2.html");

	// side gets its original markup back before main is overwritten
	assert_eq!(
		harness.dom.injections(),
		vec![
			("side".to_string(), String::new()),
			("main".to_string(), "<p>page2.html</p>".to_string()),
		]
	);
	assert_eq!(engine.state(), state(&[("main", "page2.html")]));
	assert_eq!(harness.dom.content("main").as_deref(), Some("<p>page2.html</p>"));
	assert!(!harness.dom.contains("side"));
	assert_eq!(harness.history.address(), "/index.html#!main=page2.html");
	assert_eq!(engine.level(), 1);
}

#[rstest]
fn test_removing_region_restores_original_markup(harness: Harness, config: EngineConfig) {
	let engine = harness.engine(config);
	engine.start().unwrap();
	engine.set_region("main", "page1.html").unwrap();
	assert!(!harness.dom.contains("side"));

	let report = engine.remove_region("main").unwrap();

	assert_eq!(report.applied.deleted, vec![RegionId::new("main")]);
	assert_eq!(harness.dom.content("main").as_deref(), Some(MAIN_DEFAULT));
	assert!(harness.dom.contains("side"));
	assert_eq!(harness.history.address(), PAGE);
	assert!(engine.state().is_empty());
}

#[rstest]
fn test_default_sentinel_restores_original_markup(harness: Harness, config: EngineConfig) {
	let engine = harness.engine(config);
	engine.start().unwrap();
	engine.set_region("footer", "f.html").unwrap();

	engine.set_region("footer", "default").unwrap();

	assert_eq!(harness.dom.content("footer").as_deref(), Some(FOOTER_DEFAULT));
	assert_eq!(harness.history.address(), "/index.html#!footer=default");
	assert_eq!(harness.fetcher.requested_locators(), vec!["f.html"]);
}

#[rstest]
fn test_default_pair_does_not_block_dropping_missing_regions(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=a.html");
	let engine = harness.engine(config);
	engine.start().unwrap();

	harness
		.history
		.navigate("/index.html#!main=default,!footer=f.html,!ghost=g.html");

	assert_eq!(
		engine.state(),
		state(&[("main", "default"), ("footer", "f.html")])
	);
	assert_eq!(
		harness.history.address(),
		"/index.html#!main=default,!footer=f.html"
	);
	assert_eq!(harness.dom.content("main").as_deref(), Some(MAIN_DEFAULT));
	assert_eq!(harness.dom.content("footer").as_deref(), Some("<p>f.html</p>"));
}

#[rstest]
fn test_pending_fetch_does_not_overwrite_default_region(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=a.html").with_fetcher(MockFetcher::manual());
	let engine = harness.engine(config);
	engine.start().unwrap();

	harness.history.navigate("/index.html#!main=default");
	harness.fetcher.complete("main");

	assert_eq!(harness.dom.content("main").as_deref(), Some(MAIN_DEFAULT));
	assert!(harness.dom.injections().is_empty());
	assert_eq!(engine.state(), state(&[("main", "default")]));
}

// ============================================================================
// History
// ============================================================================

#[rstest]
fn test_programmatic_changes_push_one_level_each(harness: Harness, config: EngineConfig) {
	let engine = harness.engine(config);
	engine.start().unwrap();

	engine.set_region("main", "a.html").unwrap();
	engine.set_region("footer", "f.html").unwrap();

	assert_eq!(engine.level(), 2);
	assert_eq!(harness.history.push_count(), 2);
	assert_eq!(harness.history.address(), "/index.html#!main=a.html,!footer=f.html");
}

#[rstest]
fn test_back_and_forward_adopt_stored_level(harness: Harness, config: EngineConfig) {
	let engine = harness.engine(config);
	engine.start().unwrap();
	engine.set_region("main", "a.html").unwrap();
	engine.set_region("main", "b.html").unwrap();

	harness.history.back();
	assert_eq!(engine.level(), 1);
	assert_eq!(engine.state(), state(&[("main", "a.html")]));
	assert_eq!(harness.dom.content("main").as_deref(), Some("<p>a.html</p>"));

	harness.history.back();
	assert_eq!(engine.level(), 0);
	assert!(engine.state().is_empty());
	assert_eq!(harness.dom.content("main").as_deref(), Some(MAIN_DEFAULT));

	harness.history.forward();
	assert_eq!(engine.level(), 1);
	assert_eq!(harness.dom.content("main").as_deref(), Some("<p>a.html</p>"));
	assert_eq!(harness.history.push_count(), 2);
}

#[rstest]
fn test_traversal_back_reinjects_nested_region(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=page1.html,!side=side1.html");
	harness.fetcher.respond_with("page1.html", PAGE1_WITH_SIDE);
	let engine = harness.engine(config);
	engine.start().unwrap();
	harness.history.navigate("/index.html#!main=page2.html");

	harness.history.back();

	assert_eq!(engine.level(), 0);
	assert_eq!(
		engine.state(),
		state(&[("main", "page1.html"), ("side", "side1.html")])
	);
	assert_eq!(harness.dom.content("side").as_deref(), Some("<p>side1.html</p>"));
}

#[rstest]
fn test_followed_link_is_stamped_one_level_deeper(harness: Harness, config: EngineConfig) {
	let engine = harness.engine(config);
	engine.start().unwrap();

	harness.history.navigate("/index.html#!main=c.html");

	let entry = harness.history.entry().unwrap();
	assert_eq!(entry.level, 1);
	assert_eq!(entry.encoded_pairs, "#!main=c.html");
	assert_eq!(harness.history.push_count(), 0);
	assert_eq!(harness.history.len(), 2);
}

#[rstest]
fn test_incremental_link_is_merged_into_state(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=page1.html");
	let engine = harness.engine(config);
	engine.start().unwrap();

	harness.history.navigate("/index.html#+footer=f.html");

	assert_eq!(
		engine.state(),
		state(&[("main", "page1.html"), ("footer", "f.html")])
	);
	assert_eq!(
		harness.history.address(),
		"/index.html#!main=page1.html,!footer=f.html"
	);
	assert_eq!(harness.dom.content("footer").as_deref(), Some("<p>f.html</p>"));
}

#[rstest]
fn test_plain_anchor_is_left_alone(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=a.html");
	let engine = harness.engine(config);
	engine.start().unwrap();
	let writes = harness.history.writes().len();

	harness.history.navigate("/index.html#section-2");

	assert_eq!(engine.state(), state(&[("main", "a.html")]));
	assert_eq!(harness.history.address(), "/index.html#section-2");
	assert_eq!(harness.history.writes().len(), writes);
}

#[rstest]
fn test_own_writes_do_not_start_a_cycle(config: EngineConfig) {
	let harness = Harness::at(PAGE).with_history(MockHistory::new(PAGE).notifying_writes());
	let engine = harness.engine(config);
	engine.start().unwrap();

	engine.set_region("main", "a.html").unwrap();

	assert_eq!(harness.fetcher.requested_locators(), vec!["a.html"]);
	assert!(engine.handle_address_change().unwrap().is_none());
	assert_eq!(harness.history.push_count(), 1);
}

#[rstest]
fn test_one_cycle_per_navigation_event(config: EngineConfig) {
	let harness = Harness::at(PAGE).with_history(MockHistory::new(PAGE).notifying_writes());
	let observer = RecordingObserver::new();
	let engine = harness.engine(config);
	engine.observe(observer.clone()).unwrap();
	engine.start().unwrap();
	observer.clear();

	harness.history.navigate("/index.html#!main=a.html");
	harness.history.navigate("/index.html#main=b.html");
	harness.history.back();

	let cycles = observer
		.events()
		.iter()
		.filter(|e| matches!(e, ObserverEvent::BeforeDiff(_)))
		.count();
	assert_eq!(cycles, 3);
	assert_eq!(harness.dom.content("main").as_deref(), Some("<p>a.html</p>"));
}

#[rstest]
fn test_change_all_replaces_the_whole_state(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=a.html,!footer=f.html");
	let engine = harness.engine(config);
	engine.start().unwrap();

	let report = engine.change_all("!footer=g.html").unwrap();

	assert_eq!(engine.state(), state(&[("footer", "g.html")]));
	assert_eq!(report.address.as_deref(), Some("/index.html#!footer=g.html"));
	assert_eq!(harness.dom.content("main").as_deref(), Some(MAIN_DEFAULT));
	assert_eq!(harness.history.push_count(), 1);
}

// ============================================================================
// Degraded paths
// ============================================================================

#[rstest]
fn test_fetch_error_injects_error_markup(harness: Harness, config: EngineConfig) {
	harness
		.fetcher
		.respond("missing.html", FetchOutcome::Error(404));
	let engine = harness.engine(config.clone());
	engine.start().unwrap();

	engine.set_region("main", "missing.html").unwrap();

	assert_eq!(
		harness.dom.content("main"),
		Some(config.render_error(404, "missing.html"))
	);
	assert_eq!(engine.state(), state(&[("main", "missing.html")]));
}

#[rstest]
fn test_timeout_injects_timeout_markup(config: EngineConfig) {
	let harness = Harness::at(PAGE).with_fetcher(MockFetcher::manual());
	let engine = harness.engine(config.clone().with_timeout_template("slow: {locator}"));
	engine.start().unwrap();
	engine.set_region("main", "slow.html").unwrap();

	harness.fetcher.complete_with("main", FetchOutcome::Timeout);

	assert_eq!(harness.dom.content("main").as_deref(), Some("slow: slow.html"));
}

#[rstest]
fn test_missing_first_region_aborts_the_batch(config: EngineConfig) {
	let harness = Harness::at("/index.html#!ghost=g.html,!main=a.html");
	let engine = harness.engine(config);

	let report = engine.start().unwrap();

	assert_eq!(report.applied.aborted_at, Some(RegionId::new("ghost")));
	assert!(report.address.is_none());
	assert!(engine.state().is_empty());
	assert!(harness.fetcher.requests().is_empty());
	assert!(harness.history.writes().is_empty());
}

#[rstest]
fn test_regions_that_never_appear_are_dropped(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=page1.html,!ghost=g.html")
		.with_fetcher(MockFetcher::manual());
	let engine = harness.engine(config);
	engine.start().unwrap();
	assert_eq!(
		harness.history.address(),
		"/index.html#!main=page1.html,!ghost=g.html"
	);

	harness.fetcher.complete("ghost");
	harness.fetcher.complete("main");

	assert_eq!(engine.state(), state(&[("main", "page1.html")]));
	assert_eq!(harness.history.address(), "/index.html#!main=page1.html");
	assert!(matches!(harness.history.writes().last(), Some(HistoryWrite::Replace(..))));
	assert!(engine.handle_address_change().unwrap().is_none());
}

#[rstest]
fn test_nested_region_waits_for_its_node(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=page1.html,!side=s.html")
		.with_fetcher(MockFetcher::manual());
	let harness = Harness {
		dom: MockDom::new().with_region("main", "<p>plain</p>"),
		..harness
	};
	harness.fetcher.respond_with("page1.html", PAGE1_WITH_SIDE);
	let engine = harness.engine(config);
	engine.start().unwrap();

	harness.fetcher.complete("side");
	assert!(!harness.dom.contains("side"));

	harness.fetcher.complete("main");

	assert_eq!(harness.dom.content("side").as_deref(), Some("<p>s.html</p>"));
	assert_eq!(harness.dom.injected_regions(), vec!["main", "side"]);
	assert_eq!(engine.state().len(), 2);
}

#[rstest]
fn test_ready_region_is_injected_before_earlier_ones(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=a.html,!footer=f.html")
		.with_fetcher(MockFetcher::manual());
	let engine = harness.engine(config);
	engine.start().unwrap();

	harness.fetcher.complete("footer");

	assert_eq!(harness.dom.injected_regions(), vec!["footer"]);
	assert_eq!(harness.fetcher.pending(), vec![RegionId::new("main")]);
}

#[rstest]
fn test_late_arrival_after_navigation_is_dropped(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=a.html").with_fetcher(MockFetcher::manual());
	let engine = harness.engine(config);
	engine.start().unwrap();

	harness.history.navigate("/index.html#!footer=f.html");
	harness.fetcher.complete("main");

	assert_eq!(harness.dom.content("main").as_deref(), Some(MAIN_DEFAULT));
}

// ============================================================================
// Observers
// ============================================================================

#[rstest]
fn test_observers_see_every_phase(config: EngineConfig) {
	let harness = Harness::at("/index.html#!main=page1.html");
	let observer = RecordingObserver::new().with_suffix("<!-- seen -->");
	let engine = harness.engine(config);
	engine.observe(observer.clone()).unwrap();

	engine.start().unwrap();

	assert_eq!(
		observer.events(),
		vec![
			ObserverEvent::BeforeDiff(1),
			ObserverEvent::AfterDiff(state(&[("main", "page1.html")])),
			ObserverEvent::BeforeInject(RegionId::new("main")),
			ObserverEvent::AfterInject(RegionId::new("main")),
		]
	);
	assert_eq!(
		harness.dom.content("main").as_deref(),
		Some("<p>page1.html</p><!-- seen -->")
	);
}
