//! Scenario files played end to end.

use std::io::Write as _;

use lanewar_core::simulation::Simulation;
use lanewar_headless::{HeadlessRunner, RunConfig, Scenario};
use lanewar_test_utils::determinism::{replay_commands, TimedCommand};

const RUSH: &str = r#"
Scenario(
    name: "Spearman rush",
    difficulty: medium,
    seed: 21,
    max_ticks: 900,
    orders: [
        TimedOrder(tick: 0, command: grant_resources),
        TimedOrder(tick: 0, command: set_instant_build(true)),
        TimedOrder(tick: 0, command: enqueue_construction(building: barracks)),
        TimedOrder(tick: 2, command: enqueue_unit(building: (3), unit: spearman)),
        TimedOrder(tick: 2, command: enqueue_unit(building: (3), unit: spearman)),
        TimedOrder(tick: 2, faction: enemy, command: set_stance(lane: all, stance: hold)),
    ],
)
"#;

fn write_scenario(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(text.as_bytes()).expect("write scenario");
    file
}

#[test]
fn scenario_file_plays_to_summary() {
    let file = write_scenario(RUSH);
    let scenario = Scenario::load(file.path()).expect("valid scenario");
    assert_eq!(scenario.orders.len(), 6);

    let config = RunConfig {
        snapshot_every: 300,
        realtime: false,
    };
    let mut out = Vec::new();
    let summary = HeadlessRunner::new(scenario, config, &mut out).run().expect("run");

    assert_eq!(summary.orders_rejected, 0);
    assert_eq!(summary.player.units_produced.get("spearman"), Some(&2));
    assert_eq!(summary.player.buildings_constructed.get("barracks"), Some(&1));
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.lines().last().is_some_and(|l| l.contains(r#""type":"summary""#)));
}

#[test]
fn runner_matches_direct_replay() {
    let scenario = Scenario::from_ron_str(RUSH).expect("valid scenario");
    let commands: Vec<TimedCommand> = scenario
        .orders
        .iter()
        .map(|order| TimedCommand {
            tick: order.tick,
            faction: order.faction,
            command: order.command.clone(),
        })
        .collect();
    let config = scenario.match_config();
    let direct = replay_commands(|| Simulation::new(config.clone()), &commands, scenario.max_ticks);

    let summary = HeadlessRunner::new(scenario, RunConfig::default(), std::io::sink())
        .run()
        .expect("run");
    assert_eq!(summary.final_state_hash, direct);
}

#[test]
fn broken_file_reports_parse_error() {
    let file = write_scenario("Scenario(name: \"x\", orders: [TimedOrder(tick: 0)])");
    let err = Scenario::load(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("Failed to parse scenario"));
}
