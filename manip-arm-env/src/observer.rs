//! Assembly of backend state into [`ArmObs`].
use crate::{
    backend::{Backend, RawState, StateQuery},
    error::ArmEnvError,
    obs::{ArmObs, ObsLayout},
};
use anyhow::Result;
use log::trace;
use nalgebra::Vector3;
use ndarray::Array1;

/// Lays out raw backend state as a fixed-length observation vector.
pub struct ObservationComposer {
    query: StateQuery,
    layout: ObsLayout,
}

impl ObservationComposer {
    /// Builds a composer for the given joints and object setting.
    pub fn new(joint_names: Vec<String>, has_object: bool) -> Self {
        let layout = ObsLayout {
            n_joints: joint_names.len(),
        };
        Self {
            query: StateQuery {
                joint_names,
                has_object,
            },
            layout,
        }
    }

    /// The query passed to [`Backend::read_state`].
    pub fn query(&self) -> &StateQuery {
        &self.query
    }

    /// Layout of the observations built by this composer.
    pub fn layout(&self) -> ObsLayout {
        self.layout
    }

    /// Reads the backend and composes an observation.
    ///
    /// Reads only; calling it twice without an intervening command yields identical
    /// observations.
    pub fn observe<B: Backend>(
        &self,
        backend: &B,
        success: f32,
        goal: &Vector3<f32>,
    ) -> Result<(ArmObs, RawState)> {
        let state = backend.read_state(&self.query)?;
        let obs = self.compose(&state, success, goal)?;
        Ok((obs, state))
    }

    /// Composes an observation from raw state.
    pub fn compose(&self, state: &RawState, success: f32, goal: &Vector3<f32>) -> Result<ArmObs> {
        let n = self.layout.n_joints;
        if state.joint_pos.len() != n {
            return Err(ArmEnvError::shape("joint positions", n, state.joint_pos.len()).into());
        }
        if state.joint_vel.len() != n {
            return Err(ArmEnvError::shape("joint velocities", n, state.joint_vel.len()).into());
        }

        let grip_pos = state.grip_pos;
        let (object_pos, object_rel_pos) = match (self.query.has_object, state.object.as_ref()) {
            (true, Some(object)) => (object.pos, object.pos - grip_pos),
            (true, None) => {
                return Err(
                    ArmEnvError::DataUnavailable("object state was not provided".into()).into(),
                )
            }
            (false, _) => (Vector3::zeros(), Vector3::zeros()),
        };

        let mut v = Vec::with_capacity(self.layout.len());
        v.extend_from_slice(grip_pos.as_slice());
        v.extend_from_slice(object_pos.as_slice());
        v.extend_from_slice(object_rel_pos.as_slice());
        v.extend_from_slice(&state.joint_pos);
        v.extend_from_slice(&state.joint_vel);
        v.push(success);
        trace!("observation: {:?}", v);

        let achieved_goal = match self.query.has_object {
            true => object_pos,
            false => grip_pos,
        };

        Ok(ArmObs {
            observation: Array1::from(v),
            achieved_goal,
            desired_goal: *goal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ObjectState;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("joint{}", i + 1)).collect()
    }

    fn state(object: Option<ObjectState>) -> RawState {
        RawState {
            grip_pos: Vector3::new(0.8, 0.0, 0.8),
            grip_velp: Vector3::zeros(),
            object,
            joint_pos: vec![0.1, 0.2],
            joint_vel: vec![-0.1, -0.2],
        }
    }

    #[test]
    fn layout_with_object() {
        let composer = ObservationComposer::new(names(2), true);
        let object = ObjectState {
            pos: Vector3::new(1.0, -0.5, 0.7),
            ..Default::default()
        };
        let obs = composer
            .compose(&state(Some(object)), 1.0, &Vector3::repeat(1.0))
            .unwrap();

        assert_eq!(obs.observation.len(), 14);
        assert_eq!(obs.grip_pos(), Vector3::new(0.8, 0.0, 0.8));
        assert_eq!(obs.object_pos(), Vector3::new(1.0, -0.5, 0.7));
        let rel = obs.object_rel_pos();
        assert!((rel[0] - 0.2).abs() < 1e-6 && (rel[2] + 0.1).abs() < 1e-6);
        assert_eq!(obs.joint_pos(), vec![0.1, 0.2]);
        assert_eq!(obs.joint_vel(), vec![-0.1, -0.2]);
        assert_eq!(obs.success_flag(), 1.0);
        assert_eq!(obs.achieved_goal, Vector3::new(1.0, -0.5, 0.7));
    }

    #[test]
    fn object_fields_zero_filled_without_object() {
        let composer = ObservationComposer::new(names(2), false);
        let obs = composer.compose(&state(None), 0.0, &Vector3::zeros()).unwrap();

        assert_eq!(obs.observation.len(), 14);
        assert_eq!(obs.object_pos(), Vector3::zeros());
        assert_eq!(obs.object_rel_pos(), Vector3::zeros());
        assert_eq!(obs.achieved_goal, Vector3::new(0.8, 0.0, 0.8));
    }

    #[test]
    fn joint_count_mismatch() {
        let composer = ObservationComposer::new(names(3), false);
        let err = composer.compose(&state(None), 0.0, &Vector3::zeros()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ArmEnvError>(),
            Some(&ArmEnvError::shape("joint positions", 3, 2))
        );
    }
}
