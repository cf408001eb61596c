//! End-to-end waypoint scenarios against the in-process latched topics.

use std::sync::Arc;
use std::time::Duration;

use marga_nav::core::types::{Quaternion, VehicleState, Waypoint};
use marga_nav::error::Error;
use marga_nav::publish::Topics;
use marga_nav::sequencer::{SequencerConfig, WaypointSequencer};

const TIMEOUT: Duration = Duration::from_millis(500);

fn scenario_sequencer() -> (WaypointSequencer<Arc<Topics>>, Arc<Topics>) {
    let topics = Arc::new(Topics::new());
    let config = SequencerConfig::new(vec![
        Waypoint::new(0.0, 0.0, 10.0, 0.0),
        Waypoint::new(5.0, 5.0, 10.0, 0.0),
        Waypoint::new(10.0, 10.0, 10.0, 0.0),
    ])
    .with_threshold(1.0)
    .with_cyclical(true);
    let sequencer = WaypointSequencer::new(config, Arc::clone(&topics)).unwrap();
    (sequencer, topics)
}

fn vehicle_at(x: f64, y: f64, z_down: f64) -> VehicleState {
    VehicleState::new([x, y, z_down], Quaternion::IDENTITY)
}

#[test]
fn test_scenario_arrival_advances_target() {
    let (mut sequencer, topics) = scenario_sequencer();
    let targets = topics.target.subscribe();
    assert_eq!(targets.recv_timeout(TIMEOUT).unwrap().x, 0.0);

    assert!(sequencer.on_vehicle_state(&vehicle_at(0.0, 0.0, -10.0)));
    assert_eq!(sequencer.current_index(), 1);

    let target = targets.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(
        (target.x, target.y, target.altitude, target.yaw),
        (5.0, 5.0, 10.0, 0.0)
    );
    assert_eq!(target.mode.code(), 5);
}

#[test]
fn test_scenario_remove_current_republishes_successor() {
    let (mut sequencer, topics) = scenario_sequencer();
    sequencer.on_vehicle_state(&vehicle_at(0.0, 0.0, -10.0));
    assert_eq!(sequencer.current_index(), 1);

    let targets = topics.target.subscribe();
    // Latched value is the target for index 1
    assert_eq!(targets.recv_timeout(TIMEOUT).unwrap().x, 5.0);

    assert_eq!(sequencer.remove_waypoint(1).unwrap(), 2);
    assert_eq!(sequencer.current_index(), 1);
    assert_eq!(sequencer.current_waypoint(), &Waypoint::new(10.0, 10.0, 10.0, 0.0));

    let target = targets.recv_timeout(TIMEOUT).unwrap();
    assert_eq!((target.x, target.y), (10.0, 10.0));
}

#[test]
fn test_scenario_insert_before_current_keeps_target() {
    let (mut sequencer, topics) = scenario_sequencer();
    let targets = topics.target.subscribe();
    targets.recv_timeout(TIMEOUT).unwrap();

    assert_eq!(
        sequencer
            .add_waypoint(Waypoint::new(1.0, 1.0, 1.0, 0.0), 0)
            .unwrap(),
        4
    );
    assert_eq!(sequencer.current_index(), 1);
    assert_eq!(sequencer.current_waypoint(), &Waypoint::new(0.0, 0.0, 10.0, 0.0));
    // Target unchanged, nothing republished
    assert!(targets.try_recv().is_none());
}

#[test]
fn test_scenario_remove_out_of_range() {
    let (mut sequencer, _topics) = scenario_sequencer();

    assert!(matches!(
        sequencer.remove_waypoint(5),
        Err(Error::IndexOutOfRange { index: 5, len: 3 })
    ));
    assert_eq!(sequencer.len(), 3);
}

#[test]
fn test_full_lap_wraps_to_start() {
    let (mut sequencer, topics) = scenario_sequencer();

    sequencer.on_vehicle_state(&vehicle_at(0.0, 0.0, -10.0));
    sequencer.on_vehicle_state(&vehicle_at(5.0, 5.0, -10.0));
    sequencer.on_vehicle_state(&vehicle_at(10.0, 10.0, -10.0));

    assert_eq!(sequencer.current_index(), 0);
    assert_eq!(topics.target.latest().unwrap().x, 0.0);

    let pose = topics.relative_pose.latest().unwrap();
    assert_eq!((pose.x, pose.y, pose.altitude), (10.0, 10.0, 10.0));
}

#[test]
fn test_late_subscriber_gets_latched_values() {
    let (mut sequencer, topics) = scenario_sequencer();
    sequencer.on_vehicle_state(&vehicle_at(0.0, 0.0, -10.0));
    sequencer.on_vehicle_state(&vehicle_at(3.0, 4.0, -2.0));

    let targets = topics.target.subscribe();
    let poses = topics.relative_pose.subscribe();

    assert_eq!(targets.recv_timeout(TIMEOUT).unwrap().x, 5.0);
    let pose = poses.recv_timeout(TIMEOUT).unwrap();
    assert_eq!((pose.x, pose.y, pose.altitude), (3.0, 4.0, 2.0));
    // Exactly one latched value each
    assert!(targets.try_recv().is_none());
    assert!(poses.try_recv().is_none());
}
