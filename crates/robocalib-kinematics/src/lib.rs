//! Forward kinematics for serial robot arms.
//!
//! A chain is described by a [`ChainDescriptor`] (URDF-like joints with
//! `origin` and `axis`, usually loaded from JSON), validated once by
//! [`KinematicChain::from_descriptor`], and evaluated with
//! [`compute_pose`]. Evaluation is pure: the same angles always give the
//! bit-identical pose.
//!
//! Lengths are in the units of the descriptor. Use millimetres so that
//! gripper poses match calibration target units.

mod chain;
mod descriptor;
mod joint_data;

pub use chain::{compute_pose, ChainJoint, KinematicChain};
pub use descriptor::{ChainDescriptor, JointDescriptor, JointType, Origin};
pub use joint_data::{parse_joint_csv, JointDataError};
