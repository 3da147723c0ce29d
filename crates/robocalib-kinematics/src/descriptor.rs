use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use robocalib_core::{Iso3, Real, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    /// Rotation about `axis` by the joint angle (radians).
    Revolute,
    /// Translation along `axis` by the joint value.
    Prismatic,
    /// Rigid offset, consumes no joint value.
    Fixed,
}

impl JointType {
    pub fn is_movable(self) -> bool {
        !matches!(self, JointType::Fixed)
    }
}

/// Pose of a joint frame in its parent link, URDF style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Origin {
    pub xyz: [Real; 3],
    /// Fixed-axis roll, pitch, yaw (radians): `R = Rz(yaw) Ry(pitch) Rx(roll)`.
    pub rpy: [Real; 3],
}

impl Origin {
    pub fn to_isometry(&self) -> Iso3 {
        let [x, y, z] = self.xyz;
        let [roll, pitch, yaw] = self.rpy;
        Iso3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_euler_angles(roll, pitch, yaw)),
        )
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.xyz.iter().chain(&self.rpy).all(|v| v.is_finite())
    }
}

fn default_axis() -> [Real; 3] {
    [0.0, 0.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default = "default_axis")]
    pub axis: [Real; 3],
}

impl JointDescriptor {
    pub(crate) fn axis_vector(&self) -> Vec3 {
        Vec3::new(self.axis[0], self.axis[1], self.axis[2])
    }
}

/// Robot description as loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    #[serde(default)]
    pub name: String,
    pub base_link: String,
    /// End-effector link. Optional when the tree is a single branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_link: Option<String>,
    pub joints: Vec<JointDescriptor>,
}
