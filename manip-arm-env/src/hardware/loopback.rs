//! An in-process stand-in for the physical arm.
//!
//! Serves the arm service and publishes both feeds from a trivial arm model: the end
//! effector moves exactly as commanded and a closed gripper near the object carries it.
//! Used for dry runs of the control loop without hardware.
use super::{
    backend::HardwareLink,
    feed::{JointStateMsg, ObjectPoseMsg},
    service::{arm_service_channel, ArmCall, ArmRequest, ArmResponse},
};
use crate::types::{gripper_down, Pose};
use anyhow::Result;
use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace};
use nalgebra::Vector3;
use std::thread::JoinHandle;

/// Configuration of [`LoopbackArm`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoopbackConfig {
    /// Joints published on the joint state feed.
    pub joint_names: Vec<String>,

    /// Initial end-effector pose.
    pub ee_pose: Pose,

    /// Initial object position, `None` publishes no object pose.
    pub object_pos: Option<Vector3<f32>>,

    /// A closed gripper carries the object within this distance.
    pub grasp_radius: f32,

    /// If `true`, requests are received but never answered.
    pub silent: bool,

    /// If `true`, relative end-effector moves are refused with `Done(false)`.
    pub reject_motions: bool,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            joint_names: crate::config::DEFAULT_ARM_JOINT_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ee_pose: Pose::new(Vector3::new(0.8, 0.0, 0.8), gripper_down()),
            object_pos: Some(Vector3::new(0.9, 0.1, 0.7)),
            grasp_radius: 0.05,
            silent: false,
            reject_motions: false,
        }
    }
}

struct ArmModel {
    config: LoopbackConfig,
    ee_pose: Pose,
    joints: Vec<f32>,
    object_pos: Option<Vector3<f32>>,
    closed: bool,
    joint_tx: Sender<JointStateMsg>,
    object_tx: Sender<ObjectPoseMsg>,
}

impl ArmModel {
    fn publish(&self) {
        let n = self.config.joint_names.len();
        let _ = self.joint_tx.send(JointStateMsg {
            timestamp: Utc::now(),
            names: self.config.joint_names.clone(),
            positions: self.joints.clone(),
            velocities: vec![0.0; n],
            efforts: vec![0.0; n],
        });
        if let Some(position) = self.object_pos {
            let _ = self.object_tx.send(ObjectPoseMsg {
                timestamp: Utc::now(),
                position,
            });
        }
    }

    fn move_ee(&mut self, position: Vector3<f32>) {
        let holding = match self.object_pos {
            Some(object) => {
                self.closed && (object - self.ee_pose.position).norm() < self.config.grasp_radius
            }
            None => false,
        };
        self.ee_pose.position = position;
        if holding {
            self.object_pos = Some(position);
        }
    }

    fn handle(&mut self, request: &ArmRequest) -> ArmResponse {
        match request {
            ArmRequest::Ping => ArmResponse::Pong,
            ArmRequest::GetEePose => ArmResponse::EePose(self.ee_pose),
            ArmRequest::GetEeOrientation => {
                ArmResponse::EeOrientation(self.ee_pose.euler())
            }
            ArmRequest::SetJointPositions(q) => {
                if q.len() != self.joints.len() {
                    return ArmResponse::Error(format!("expected {} joints", self.joints.len()));
                }
                self.joints = q.clone();
                ArmResponse::Done(true)
            }
            ArmRequest::SetEePose(pose) => {
                self.move_ee(pose.position);
                self.ee_pose.orientation = pose.orientation;
                ArmResponse::Done(true)
            }
            ArmRequest::SetEePoseRelative(_) if self.config.reject_motions => {
                ArmResponse::Done(false)
            }
            ArmRequest::SetEePoseRelative(delta) => {
                self.move_ee(self.ee_pose.position + delta);
                ArmResponse::Done(true)
            }
            ArmRequest::OpenGripper | ArmRequest::ResetGripper => {
                self.closed = false;
                ArmResponse::Done(true)
            }
            ArmRequest::CloseGripper => {
                self.closed = true;
                ArmResponse::Done(true)
            }
        }
    }

    fn serve(mut self, calls: Receiver<ArmCall>) {
        self.publish();
        let mut unanswered = vec![];
        for call in calls.iter() {
            trace!("loopback arm: {:?}", call.request);
            if self.config.silent {
                unanswered.push(call);
                continue;
            }
            let response = self.handle(&call.request);
            // Feeds reflect a motion by the time its call returns.
            self.publish();
            call.respond(response);
        }
        debug!("Loopback arm stopped");
    }
}

/// A thread serving the arm service and publishing feeds.
///
/// The thread stops when every sender of the arm service channel is dropped.
pub struct LoopbackArm {
    handle: JoinHandle<()>,
}

impl LoopbackArm {
    /// Starts the arm and returns the channels to connect a
    /// [`HardwareBackend`](crate::HardwareBackend) to.
    pub fn spawn(config: LoopbackConfig) -> Result<(Self, HardwareLink)> {
        let (call_tx, call_rx) = arm_service_channel();
        let (joint_tx, joint_rx) = unbounded();
        let (object_tx, object_rx) = unbounded();

        let model = ArmModel {
            ee_pose: config.ee_pose,
            joints: vec![0.0; config.joint_names.len()],
            object_pos: config.object_pos,
            closed: false,
            joint_tx,
            object_tx,
            config,
        };
        let handle = std::thread::Builder::new()
            .name("loopback-arm".into())
            .spawn(move || model.serve(call_rx))?;

        let link = HardwareLink {
            arm_service: call_tx,
            joint_states: joint_rx,
            object_pose: object_rx,
        };
        Ok((Self { handle }, link))
    }

    /// Whether the thread has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
