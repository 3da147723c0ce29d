use approx::assert_relative_eq;
use robocalib_core::{is_proper_rotation, rotation_matrix};
use robocalib_kinematics::{compute_pose, parse_joint_csv, ChainDescriptor, KinematicChain};

const ARM_JSON: &str = r#"{
  "name": "six-axis",
  "base_link": "base_link",
  "tip_link": "flange",
  "joints": [
    {"name": "shoulder_pan",  "type": "revolute", "parent": "base_link", "child": "shoulder",
     "origin": {"xyz": [0, 0, 120]}, "axis": [0, 0, 1]},
    {"name": "shoulder_lift", "type": "revolute", "parent": "shoulder", "child": "upper_arm",
     "origin": {"xyz": [0, 0, 40], "rpy": [0, 0, 0]}, "axis": [0, 1, 0]},
    {"name": "elbow_flex",    "type": "revolute", "parent": "upper_arm", "child": "forearm",
     "origin": {"xyz": [0, 0, 280]}, "axis": [0, 1, 0]},
    {"name": "wrist_flex",    "type": "revolute", "parent": "forearm", "child": "wrist",
     "origin": {"xyz": [250, 0, 0]}, "axis": [0, 1, 0]},
    {"name": "wrist_roll",    "type": "revolute", "parent": "wrist", "child": "wrist2",
     "origin": {"xyz": [60, 0, 0]}, "axis": [1, 0, 0]},
    {"name": "tool_yaw",      "type": "revolute", "parent": "wrist2", "child": "wrist3",
     "origin": {"xyz": [0, 0, 0]}, "axis": [0, 0, 1]},
    {"name": "flange_mount",  "type": "fixed", "parent": "wrist3", "child": "flange",
     "origin": {"xyz": [45, 0, 0], "rpy": [0, 1.5707963267948966, 0]}},
    {"name": "camera_mount",  "type": "fixed", "parent": "wrist3", "child": "camera_link",
     "origin": {"xyz": [30, 0, 50]}}
  ]
}"#;

fn chain() -> KinematicChain {
    let desc: ChainDescriptor = serde_json::from_str(ARM_JSON).unwrap();
    KinematicChain::from_descriptor(&desc).unwrap()
}

#[test]
fn home_pose_is_the_sum_of_offsets() {
    let chain = chain();
    assert_eq!(chain.movable_joint_count(), 6);
    let pose = compute_pose(&chain, &[0.0; 6]).unwrap();
    let t = pose.translation.vector;
    assert_relative_eq!(t.x, 250.0 + 60.0 + 45.0, epsilon = 1e-9);
    assert_relative_eq!(t.z, 120.0 + 40.0 + 280.0, epsilon = 1e-9);
}

#[test]
fn evaluation_is_bit_identical_and_orthonormal() {
    let chain = chain();
    let rows = parse_joint_csv(
        "j1,j2,j3,j4,j5,j6\n0.0,0.5,-1.2,0.0,1.57,0.0\n0.2,0.7,-1.0,0.1,1.47,0.1\n-0.1,0.6,-1.1,0.05,1.52,0.05\n",
    )
    .unwrap();
    for angles in &rows {
        let a = compute_pose(&chain, angles).unwrap();
        let b = compute_pose(&chain, angles).unwrap();
        assert_eq!(a.translation.vector.as_slice(), b.translation.vector.as_slice());
        assert_eq!(a.rotation.coords.as_slice(), b.rotation.coords.as_slice());
        assert!(is_proper_rotation(&rotation_matrix(&a), 1e-6));
    }
}

#[test]
fn shoulder_pan_rotates_the_whole_arm() {
    let chain = chain();
    let home = compute_pose(&chain, &[0.0; 6]).unwrap();
    let panned = compute_pose(&chain, &[std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
    assert_relative_eq!(panned.translation.vector.y, home.translation.vector.x, epsilon = 1e-9);
    assert_relative_eq!(panned.translation.vector.z, home.translation.vector.z, epsilon = 1e-9);
}
