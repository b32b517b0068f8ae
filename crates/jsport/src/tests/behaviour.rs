//! Behaviour-driven tests for the bridge protocol.

use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::{FakeService, request};
use crate::bridge::{Bridge, BridgeOptions};
use crate::lifecycle::{LifecyclePhase, ProcessTeardown, StopReport, TeardownOutcome};
use crate::response::Outcome;

#[derive(Default)]
struct World {
    service: FakeService,
    teardown: Arc<ProcessTeardown>,
    bridge: Option<Bridge<FakeService, Vec<u8>>>,
    outcome: Option<Outcome>,
    report: Option<StopReport>,
}

impl World {
    fn bridge(&mut self) -> &mut Bridge<FakeService, Vec<u8>> {
        self.bridge.as_mut().expect("bridge should be attached")
    }

    fn send(&mut self, buffer: &[u8]) {
        let bridge = self.bridge();
        let written = bridge.output().len();
        let outcome = bridge.process(buffer).expect("request should be processed");
        let frame = bridge.output().get(written..).expect("response frame").to_vec();
        let term = outcome.to_term().encode().expect("encode");
        assert_eq!(frame.get(4..), Some(term.as_slice()), "written frame matches outcome");
        self.outcome = Some(outcome);
    }

    fn outcome(&self) -> &Outcome {
        self.outcome.as_ref().expect("a response should be recorded")
    }
}

#[fixture]
fn world() -> World {
    World::default()
}

#[given("an attached bridge")]
fn given_attached(world: &mut World) {
    let options = BridgeOptions::default().with_teardown(Arc::clone(&world.teardown));
    let bridge = Bridge::attach(world.service.clone(), Vec::new(), options).expect("attach");
    world.bridge = Some(bridge);
}

#[when("the host evaluates {code} for its value")]
fn when_eval_json(world: &mut World, code: String) {
    world.send(&request(b"ej", &["scenario.js", code.trim_matches('"')]));
}

#[when("the host evaluates {code} for its side effects")]
fn when_eval_discard(world: &mut World, code: String) {
    world.send(&request(b"dj", &["scenario.js", code.trim_matches('"')]));
}

#[when("the host sends the tag {tag}")]
fn when_send_tag(world: &mut World, tag: String) {
    world.send(tag.trim_matches('"').as_bytes());
}

#[when("the host sends shutdown")]
fn when_shutdown(world: &mut World) {
    world.send(b"sd");
}

#[when("the host detaches")]
fn when_detach(world: &mut World) {
    let bridge = world.bridge.take().expect("bridge should be attached");
    world.report = Some(bridge.detach());
}

#[then("the response is ok")]
fn then_ok(world: &mut World) {
    assert_eq!(world.outcome(), &Outcome::Ok);
}

#[then("the response is ok with {payload}")]
fn then_ok_with(world: &mut World, payload: String) {
    assert_eq!(
        world.outcome(),
        &Outcome::OkWithString(payload.trim_matches('"').to_owned())
    );
}

#[then("the response is an error containing {text}")]
fn then_error_containing(world: &mut World, text: String) {
    let needle = text.trim_matches('"');
    let Outcome::ErrorWithString(message) = world.outcome() else {
        panic!("expected an error response, got {:?}", world.outcome());
    };
    assert!(message.contains(needle), "expected '{needle}' in {message}");
}

#[then("the response is unknown_command")]
fn then_unknown(world: &mut World) {
    assert_eq!(world.outcome(), &Outcome::UnknownCommand);
}

#[then("the engine is still running")]
fn then_running(world: &mut World) {
    assert_eq!(world.bridge().phase(), LifecyclePhase::Running);
    assert_eq!(world.service.log().stopped, 0);
}

#[then("process teardown has not run")]
fn then_teardown_pending(world: &mut World) {
    assert!(!world.teardown.has_run());
    assert_eq!(world.service.log().shutdowns, 0);
}

#[then("process teardown has run once")]
fn then_teardown_ran(world: &mut World) {
    let report = world.report.expect("detach should have run");
    assert_eq!(report.teardown, TeardownOutcome::Performed);
    assert_eq!(world.service.log().shutdowns, 1);
}

#[then("the engine handle was released")]
fn then_released(world: &mut World) {
    let report = world.report.expect("detach should have run");
    assert!(report.handle_released);
    assert_eq!(world.service.log().stopped, 1);
}

#[scenario(
    path = "tests/features/bridge_protocol.feature",
    name = "Evaluating an expression returns its serialization"
)]
fn eval_json_returns_serialization(world: World) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_protocol.feature",
    name = "A thrown error is returned as an error envelope"
)]
fn eval_json_thrown_error(world: World) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_protocol.feature",
    name = "Evaluating for side effects returns a bare ok"
)]
fn eval_discard_returns_ok(world: World) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_protocol.feature",
    name = "A failing side-effect evaluation returns the engine message"
)]
fn eval_discard_failure(world: World) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_protocol.feature",
    name = "Unknown command tags are rejected"
)]
fn unknown_tags_rejected(world: World) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_protocol.feature",
    name = "Globals persist between commands"
)]
fn globals_persist(world: World) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_protocol.feature",
    name = "Shutdown is deferred until detach"
)]
fn shutdown_deferred_until_detach(world: World) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_protocol.feature",
    name = "Detaching without shutdown keeps process resources"
)]
fn detach_without_shutdown(world: World) {
    drop(world);
}
