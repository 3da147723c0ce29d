use std::collections::{HashMap, HashSet};

use log::debug;
use nalgebra::{Translation3, Unit, UnitQuaternion};
use robocalib_core::{CalibError, CalibResult, Iso3, Real, Vec3};

use crate::{ChainDescriptor, JointDescriptor, JointType};

/// One joint of a validated serial chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainJoint {
    pub name: String,
    pub joint_type: JointType,
    /// Joint frame in the parent link frame.
    pub origin: Iso3,
    pub axis: Unit<Vec3>,
}

impl ChainJoint {
    /// `origin · motion(q)`.
    fn transform(&self, q: Real) -> Iso3 {
        match self.joint_type {
            JointType::Revolute => {
                self.origin * UnitQuaternion::from_axis_angle(&self.axis, q)
            }
            JointType::Prismatic => {
                self.origin * Translation3::from(self.axis.into_inner() * q)
            }
            JointType::Fixed => self.origin,
        }
    }
}

/// Serial chain from `base_link` to the tip, in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicChain {
    name: String,
    base_link: String,
    tip_link: String,
    joints: Vec<ChainJoint>,
}

fn invalid(reason: impl Into<String>) -> CalibError {
    CalibError::InvalidChain(reason.into())
}

impl KinematicChain {
    /// Validate a descriptor and extract the serial path from the base to
    /// the tip.
    ///
    /// Fails with [`CalibError::InvalidChain`] when the base link is missing,
    /// a joint is malformed, two joints drive the same child link, a joint
    /// hangs off a link that the base cannot reach (this includes cycles),
    /// or no unique tip exists.
    pub fn from_descriptor(desc: &ChainDescriptor) -> CalibResult<Self> {
        if desc.base_link.is_empty() {
            return Err(invalid("base link name is empty"));
        }
        if desc.joints.is_empty() {
            return Err(invalid("chain has no joints"));
        }

        let mut names = HashSet::new();
        let mut by_child: HashMap<&str, &JointDescriptor> = HashMap::new();
        let mut by_parent: HashMap<&str, Vec<&JointDescriptor>> = HashMap::new();
        for j in &desc.joints {
            if !names.insert(j.name.as_str()) {
                return Err(invalid(format!("duplicate joint name '{}'", j.name)));
            }
            if j.child == desc.base_link {
                return Err(invalid(format!(
                    "joint '{}' drives the base link '{}'",
                    j.name, desc.base_link
                )));
            }
            if j.parent == j.child {
                return Err(invalid(format!("joint '{}' connects a link to itself", j.name)));
            }
            if !j.origin.is_finite() {
                return Err(invalid(format!("joint '{}' has a non-finite origin", j.name)));
            }
            if by_child.insert(j.child.as_str(), j).is_some() {
                return Err(invalid(format!("link '{}' has two parent joints", j.child)));
            }
            by_parent.entry(j.parent.as_str()).or_default().push(j);
        }
        if !by_parent.contains_key(desc.base_link.as_str()) {
            return Err(invalid(format!(
                "base link '{}' is not the parent of any joint",
                desc.base_link
            )));
        }

        // Every joint must hang off a link reachable from the base. With one
        // parent joint per link, a cycle is never reachable.
        let mut reachable = HashSet::from([desc.base_link.as_str()]);
        let mut stack = vec![desc.base_link.as_str()];
        while let Some(link) = stack.pop() {
            for j in by_parent.get(link).into_iter().flatten() {
                if reachable.insert(j.child.as_str()) {
                    stack.push(j.child.as_str());
                }
            }
        }
        if let Some(j) = desc
            .joints
            .iter()
            .find(|j| !reachable.contains(j.parent.as_str()))
        {
            return Err(invalid(format!(
                "joint '{}' is attached to '{}', which is not reachable from '{}'",
                j.name, j.parent, desc.base_link
            )));
        }

        let tip = match &desc.tip_link {
            Some(tip) => {
                if !reachable.contains(tip.as_str()) {
                    return Err(invalid(format!("tip link '{tip}' is not reachable")));
                }
                tip.clone()
            }
            None => {
                let mut link = desc.base_link.as_str();
                loop {
                    match by_parent.get(link).map(Vec::as_slice) {
                        None | Some([]) => break,
                        Some([j]) => link = j.child.as_str(),
                        Some(_) => {
                            return Err(invalid(format!(
                                "link '{link}' branches; set tip_link to select the end effector"
                            )))
                        }
                    }
                }
                link.to_string()
            }
        };

        // Walk up from the tip; unique parents make the path unique.
        let mut path = Vec::new();
        let mut link = tip.as_str();
        while link != desc.base_link {
            let j = by_child
                .get(link)
                .ok_or_else(|| invalid(format!("link '{link}' has no parent joint")))?;
            path.push(*j);
            link = j.parent.as_str();
        }
        path.reverse();

        let joints = path
            .into_iter()
            .map(|j| {
                let axis = if j.joint_type.is_movable() {
                    Unit::try_new(j.axis_vector(), 1e-9).ok_or_else(|| {
                        invalid(format!("joint '{}' has a zero-length axis", j.name))
                    })?
                } else {
                    Vec3::z_axis()
                };
                Ok(ChainJoint {
                    name: j.name.clone(),
                    joint_type: j.joint_type,
                    origin: j.origin.to_isometry(),
                    axis,
                })
            })
            .collect::<CalibResult<Vec<_>>>()?;

        debug!(
            "kinematics: chain '{}' {} -> {} with {} joints ({} movable)",
            desc.name,
            desc.base_link,
            tip,
            joints.len(),
            joints.iter().filter(|j| j.joint_type.is_movable()).count()
        );
        Ok(Self {
            name: desc.name.clone(),
            base_link: desc.base_link.clone(),
            tip_link: tip,
            joints,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_link(&self) -> &str {
        &self.base_link
    }

    pub fn tip_link(&self) -> &str {
        &self.tip_link
    }

    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// Number of joint values [`Self::compute_pose`] expects.
    pub fn movable_joint_count(&self) -> usize {
        self.joints
            .iter()
            .filter(|j| j.joint_type.is_movable())
            .count()
    }

    /// Names of the movable joints in the order their values are consumed.
    pub fn movable_joint_names(&self) -> Vec<&str> {
        self.joints
            .iter()
            .filter(|j| j.joint_type.is_movable())
            .map(|j| j.name.as_str())
            .collect()
    }

    /// End-effector pose `T_base_tip` for the given joint values.
    pub fn compute_pose(&self, angles: &[Real]) -> CalibResult<Iso3> {
        let expected = self.movable_joint_count();
        if angles.len() != expected {
            return Err(CalibError::DimensionMismatch {
                expected,
                got: angles.len(),
            });
        }
        let mut values = angles.iter();
        let mut pose = Iso3::identity();
        for joint in &self.joints {
            let q = if joint.joint_type.is_movable() {
                values.next().copied().unwrap_or_default()
            } else {
                0.0
            };
            pose *= joint.transform(q);
        }
        Ok(pose)
    }
}

/// End-effector pose of `chain` at `angles`; see [`KinematicChain::compute_pose`].
pub fn compute_pose(chain: &KinematicChain, angles: &[Real]) -> CalibResult<Iso3> {
    chain.compute_pose(angles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Origin;
    use robocalib_core::Pt3;

    fn joint(name: &str, t: JointType, parent: &str, child: &str, xyz: [Real; 3], axis: [Real; 3]) -> JointDescriptor {
        JointDescriptor {
            name: name.into(),
            joint_type: t,
            parent: parent.into(),
            child: child.into(),
            origin: Origin { xyz, rpy: [0.0; 3] },
            axis,
        }
    }

    fn planar_arm() -> ChainDescriptor {
        ChainDescriptor {
            name: "planar".into(),
            base_link: "base".into(),
            tip_link: None,
            joints: vec![
                joint("j1", JointType::Revolute, "base", "l1", [0.0; 3], [0.0, 0.0, 1.0]),
                joint("j2", JointType::Revolute, "l1", "l2", [100.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
                joint("tool", JointType::Fixed, "l2", "tcp", [50.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ],
        }
    }

    #[test]
    fn two_link_planar_arm() {
        let chain = KinematicChain::from_descriptor(&planar_arm()).unwrap();
        assert_eq!(chain.tip_link(), "tcp");
        assert_eq!(chain.movable_joint_count(), 2);

        let home = chain.compute_pose(&[0.0, 0.0]).unwrap();
        assert!((home.translation.vector - Vec3::new(150.0, 0.0, 0.0)).norm() < 1e-12);

        let half = std::f64::consts::FRAC_PI_2;
        let bent = chain.compute_pose(&[half, -half]).unwrap();
        let tcp = bent * Pt3::origin();
        assert!((tcp.x - 50.0).abs() < 1e-9 && (tcp.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn prismatic_joint_translates_along_axis() {
        let desc = ChainDescriptor {
            name: String::new(),
            base_link: "base".into(),
            tip_link: Some("slider".into()),
            joints: vec![joint("z", JointType::Prismatic, "base", "slider", [0.0; 3], [0.0, 0.0, 2.0])],
        };
        let chain = KinematicChain::from_descriptor(&desc).unwrap();
        let pose = chain.compute_pose(&[12.5]).unwrap();
        assert_eq!(pose.translation.vector, Vec3::new(0.0, 0.0, 12.5));
    }

    #[test]
    fn wrong_angle_count_is_rejected() {
        let chain = KinematicChain::from_descriptor(&planar_arm()).unwrap();
        assert_eq!(
            chain.compute_pose(&[0.0; 3]).unwrap_err(),
            CalibError::DimensionMismatch { expected: 2, got: 3 }
        );
    }

    #[test]
    fn malformed_chains_are_rejected() {
        let mut missing_base = planar_arm();
        missing_base.base_link = "world".into();
        let mut cycle = planar_arm();
        cycle
            .joints
            .push(joint("loop", JointType::Fixed, "tcp", "base", [0.0; 3], [0.0, 0.0, 1.0]));
        let mut two_parents = planar_arm();
        two_parents
            .joints
            .push(joint("j2b", JointType::Revolute, "l1", "l2", [0.0; 3], [0.0, 0.0, 1.0]));
        let mut detached = planar_arm();
        detached
            .joints
            .push(joint("orphan", JointType::Revolute, "a", "b", [0.0; 3], [0.0, 0.0, 1.0]));
        let mut branching = planar_arm();
        branching
            .joints
            .push(joint("cam", JointType::Fixed, "l2", "camera", [0.0; 3], [0.0, 0.0, 1.0]));
        let mut zero_axis = planar_arm();
        zero_axis.joints[0].axis = [0.0; 3];

        for desc in [missing_base, cycle, two_parents, detached, branching, zero_axis] {
            assert!(matches!(
                KinematicChain::from_descriptor(&desc),
                Err(CalibError::InvalidChain(_))
            ));
        }
    }

    #[test]
    fn explicit_tip_resolves_branches() {
        let mut desc = planar_arm();
        desc.joints
            .push(joint("cam", JointType::Fixed, "l2", "camera", [0.0, 10.0, 0.0], [0.0, 0.0, 1.0]));
        desc.tip_link = Some("camera".into());
        let chain = KinematicChain::from_descriptor(&desc).unwrap();
        let pose = chain.compute_pose(&[0.0, 0.0]).unwrap();
        assert_eq!(pose.translation.vector, Vec3::new(100.0, 10.0, 0.0));
    }
}
