//! Observation of [`ArmEnv`](crate::ArmEnv).
use manip_core::Obs;
use nalgebra::Vector3;
use ndarray::{s, Array1};

/// Offsets of the fields in the observation vector.
///
/// `grip_pos(3) | object_pos(3) | object_rel_pos(3) | joint_pos(N) | joint_vel(N) | success(1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObsLayout {
    /// Number of arm joints `N`.
    pub n_joints: usize,
}

impl ObsLayout {
    /// Offset of the gripper position.
    pub const GRIP_POS: usize = 0;

    /// Offset of the object position.
    pub const OBJECT_POS: usize = 3;

    /// Offset of the object position relative to the gripper.
    pub const OBJECT_REL_POS: usize = 6;

    /// Offset of the joint positions.
    pub const JOINT_POS: usize = 9;

    /// Offset of the joint velocities.
    pub fn joint_vel(&self) -> usize {
        Self::JOINT_POS + self.n_joints
    }

    /// Offset of the success flag.
    pub fn success(&self) -> usize {
        Self::JOINT_POS + 2 * self.n_joints
    }

    /// Length of the observation vector.
    pub fn len(&self) -> usize {
        self.success() + 1
    }

    /// Infers the layout from the length of an observation vector.
    pub fn from_len(len: usize) -> Option<Self> {
        match len >= 10 && (len - 10) % 2 == 0 {
            true => Some(Self {
                n_joints: (len - 10) / 2,
            }),
            false => None,
        }
    }
}

/// Observation with its goal projection, as a goal-conditioned environment emits it.
#[derive(Clone, Debug, PartialEq)]
pub struct ArmObs {
    /// Flat observation vector, see [`ObsLayout`].
    pub observation: Array1<f32>,

    /// Object position if the task has an object, else gripper position.
    pub achieved_goal: Vector3<f32>,

    /// Goal of the episode.
    pub desired_goal: Vector3<f32>,
}

impl ArmObs {
    fn layout(&self) -> ObsLayout {
        // Observations are only built by ObservationComposer, which enforces the layout.
        ObsLayout::from_len(self.observation.len()).unwrap_or(ObsLayout { n_joints: 0 })
    }

    fn vec3(&self, offset: usize) -> Vector3<f32> {
        Vector3::from_iterator(self.observation.slice(s![offset..offset + 3]).iter().cloned())
    }

    /// Gripper position.
    pub fn grip_pos(&self) -> Vector3<f32> {
        self.vec3(ObsLayout::GRIP_POS)
    }

    /// Object position, zeros without an object.
    pub fn object_pos(&self) -> Vector3<f32> {
        self.vec3(ObsLayout::OBJECT_POS)
    }

    /// Object position relative to the gripper, zeros without an object.
    pub fn object_rel_pos(&self) -> Vector3<f32> {
        self.vec3(ObsLayout::OBJECT_REL_POS)
    }

    /// Arm joint positions.
    pub fn joint_pos(&self) -> Vec<f32> {
        let l = self.layout();
        self.observation
            .slice(s![ObsLayout::JOINT_POS..l.joint_vel()])
            .to_vec()
    }

    /// Arm joint velocities.
    pub fn joint_vel(&self) -> Vec<f32> {
        let l = self.layout();
        self.observation
            .slice(s![l.joint_vel()..l.success()])
            .to_vec()
    }

    /// Success flag of the last reward evaluation.
    pub fn success_flag(&self) -> f32 {
        self.observation[self.layout().success()]
    }
}

impl Obs for ArmObs {
    fn len(&self) -> usize {
        self.observation.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_for_six_joints() {
        let l = ObsLayout { n_joints: 6 };
        assert_eq!(l.joint_vel(), 15);
        assert_eq!(l.success(), 21);
        assert_eq!(l.len(), 22);
        assert_eq!(ObsLayout::from_len(22), Some(l));
        assert_eq!(ObsLayout::from_len(11), None);
    }

    #[test]
    fn accessors_follow_layout() {
        let v: Vec<f32> = (0..14).map(|i| i as f32).collect();
        let obs = ArmObs {
            observation: Array1::from(v),
            achieved_goal: Vector3::new(3.0, 4.0, 5.0),
            desired_goal: Vector3::zeros(),
        };
        assert_eq!(obs.grip_pos(), Vector3::new(0.0, 1.0, 2.0));
        assert_eq!(obs.object_pos(), Vector3::new(3.0, 4.0, 5.0));
        assert_eq!(obs.object_rel_pos(), Vector3::new(6.0, 7.0, 8.0));
        assert_eq!(obs.joint_pos(), vec![9.0, 10.0]);
        assert_eq!(obs.joint_vel(), vec![11.0, 12.0]);
        assert_eq!(obs.success_flag(), 13.0);
    }
}
