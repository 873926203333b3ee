//! Backend driving a physical arm.
use super::{
    cache::{HardwareStateCache, ObjectPoseCache},
    feed::{
        spawn_joint_state_subscriber, spawn_object_pose_subscriber, JointStateMsg, ObjectPoseMsg,
    },
    service::{ArmCall, ArmServiceClient},
    session::{self, SessionInfo},
};
use crate::{
    backend::{Backend, ObjectState, RawState, StateQuery},
    error::ArmEnvError,
    mapper::ArmCommand,
    types::{GripperState, Pose},
};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, thread::JoinHandle, time::Duration};

/// Channels connecting [`HardwareBackend`] to the arm service and the feeds.
#[derive(Debug, Clone)]
pub struct HardwareLink {
    /// Requests to the arm service.
    pub arm_service: Sender<ArmCall>,

    /// Joint state feed.
    pub joint_states: Receiver<JointStateMsg>,

    /// Object pose feed.
    pub object_pose: Receiver<ObjectPoseMsg>,
}

/// Configuration of [`HardwareBackend`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HardwareConfig {
    /// Name under which the middleware session is initialized.
    pub node_name: String,

    /// Timeout of every arm service call.
    pub service_timeout_ms: u64,

    /// Further attempts of a timed out arm service call.
    pub service_retries: usize,

    /// Timeout of each availability probe at startup.
    pub startup_attempt_timeout_ms: u64,

    /// Number of availability probes at startup.
    pub startup_max_attempts: usize,

    /// Joint positions of the home configuration.
    pub arm_joint_home: Vec<f32>,

    /// Joint positions of the prepare configuration.
    pub arm_joint_prepare: Vec<f32>,

    /// Moves the arm to the home configuration at setup.
    pub home_on_setup: bool,

    /// Channels to the arm. Provided at runtime.
    #[serde(skip)]
    pub link: Option<HardwareLink>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            node_name: "sia_7f_arm_interface".to_string(),
            service_timeout_ms: 1000,
            service_retries: 0,
            startup_attempt_timeout_ms: 1000,
            startup_max_attempts: 30,
            arm_joint_home: vec![0.0; 6],
            arm_joint_prepare: vec![0.0; 6],
            home_on_setup: false,
            link: None,
        }
    }
}

impl HardwareConfig {
    /// Sets the channels to the arm.
    pub fn link(mut self, v: HardwareLink) -> Self {
        self.link = Some(v);
        self
    }

    /// Sets the timeout of arm service calls.
    pub fn service_timeout_ms(mut self, v: u64) -> Self {
        self.service_timeout_ms = v;
        self
    }

    /// Sets the number of further attempts of a timed out arm service call.
    pub fn service_retries(mut self, v: usize) -> Self {
        self.service_retries = v;
        self
    }

    /// Sets the timeout and the number of availability probes at startup.
    pub fn startup(mut self, attempt_timeout_ms: u64, max_attempts: usize) -> Self {
        self.startup_attempt_timeout_ms = attempt_timeout_ms;
        self.startup_max_attempts = max_attempts;
        self
    }
}

/// A [`Backend`] over a physical arm.
///
/// Commands go to the arm service, joint states and object positions come from feeds
/// applied to caches by subscriber threads. The physical state cannot be rewound, so
/// [`Backend::restore`] only checks that the feeds are alive.
pub struct HardwareBackend {
    config: HardwareConfig,
    client: ArmServiceClient,
    joints: Arc<HardwareStateCache>,
    object: Arc<ObjectPoseCache>,
    subscribers: Vec<JoinHandle<()>>,
    session: SessionInfo,
    ready: bool,
}

impl HardwareBackend {
    /// The arm service client.
    pub fn client(&self) -> &ArmServiceClient {
        &self.client
    }

    /// The joint state cache.
    pub fn joint_cache(&self) -> &Arc<HardwareStateCache> {
        &self.joints
    }

    /// The middleware session this backend runs in.
    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// Moves the arm to the home configuration.
    pub fn go_home(&self) -> Result<bool> {
        info!("Arm to the home configuration");
        self.client.set_joint_positions(&self.config.arm_joint_home)
    }

    /// Moves the arm to the prepare configuration.
    pub fn go_prepare(&self) -> Result<bool> {
        info!("Arm to the prepare configuration");
        self.client.set_joint_positions(&self.config.arm_joint_prepare)
    }

    fn wait_for_feed(&self, feed: &str, wait: impl Fn(Duration) -> bool) -> Result<()> {
        let timeout = Duration::from_millis(self.config.startup_attempt_timeout_ms);
        let n = self.config.startup_max_attempts;
        for attempt in 1..=n {
            if wait(timeout) {
                debug!("{} feed ready", feed);
                return Ok(());
            }
            warn!("{} feed not ready yet, retrying ({}/{})", feed, attempt, n);
        }
        Err(ArmEnvError::DataUnavailable(format!("no {} after {} attempts", feed, n)).into())
    }

    /// Fails with [`ArmEnvError::ServiceUnavailable`] when the arm service answered
    /// a command with `Done(false)`.
    fn check_done(what: &str, ok: bool) -> Result<()> {
        match ok {
            true => Ok(()),
            false => {
                warn!("Arm service reported failure of {}", what);
                Err(ArmEnvError::ServiceUnavailable(format!("arm service rejected {}", what))
                    .into())
            }
        }
    }
}

impl Backend for HardwareBackend {
    type Config = HardwareConfig;

    fn build(config: &Self::Config) -> Result<Self> {
        let link = config
            .link
            .clone()
            .ok_or_else(|| ArmEnvError::NotReady("hardware link is not configured".into()))?;
        let session = session::init(&config.node_name);

        let joints = Arc::new(HardwareStateCache::new());
        let object = Arc::new(ObjectPoseCache::new());
        let subscribers = vec![
            spawn_joint_state_subscriber(link.joint_states, joints.clone())?,
            spawn_object_pose_subscriber(link.object_pose, object.clone())?,
        ];
        let client = ArmServiceClient::new(
            link.arm_service,
            Duration::from_millis(config.service_timeout_ms),
            config.service_retries,
        );

        Ok(Self {
            config: config.clone(),
            client,
            joints,
            object,
            subscribers,
            session,
            ready: false,
        })
    }

    fn setup(&mut self, query: &StateQuery) -> Result<()> {
        let timeout = Duration::from_millis(self.config.startup_attempt_timeout_ms);
        self.client
            .wait_for_service(timeout, self.config.startup_max_attempts)?;
        self.wait_for_feed("joint state", |t| self.joints.wait_until_ready(t))?;
        if query.has_object {
            self.wait_for_feed("object pose", |t| self.object.wait_until_ready(t))?;
        }
        Self::check_done("gripper reset", self.client.reset_gripper()?)?;
        if self.config.home_on_setup {
            Self::check_done("go home", self.go_home()?)?;
        }
        self.ready = true;
        info!("Hardware backend ready in session {}", self.session.node_name);
        Ok(())
    }

    fn checkpoint(&mut self) -> Result<()> {
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if !self.ready {
            return Err(ArmEnvError::NotReady("hardware backend is not set up".into()).into());
        }
        if self.subscribers.iter().any(|h| h.is_finished()) {
            return Err(ArmEnvError::DataUnavailable("a feed has been closed".into()).into());
        }
        Ok(())
    }

    fn place_object(&mut self, xy: Vector2<f32>, z: f32) -> Result<()> {
        info!("Place the object at ({}, {}, {})", xy.x, xy.y, z);
        Ok(())
    }

    fn set_gripper_target(&mut self, pose: &Pose) -> Result<()> {
        Self::check_done("set ee pose", self.client.set_ee_pose(pose)?)
    }

    fn settle(&mut self, _n_steps: usize) -> Result<()> {
        // Motion requests return when the motion has finished.
        Ok(())
    }

    fn apply(&mut self, cmd: &ArmCommand) -> Result<()> {
        let moved = self.client.set_ee_pose_relative(&cmd.pos_delta)?;
        Self::check_done("relative ee move", moved)?;
        match cmd.grip {
            Some(GripperState::Closed) => {
                Self::check_done("close gripper", self.client.close_gripper()?)
            }
            Some(GripperState::Open) => {
                Self::check_done("open gripper", self.client.open_gripper()?)
            }
            None => Ok(()),
        }
    }

    fn read_state(&self, query: &StateQuery) -> Result<RawState> {
        let grip_pos = self.client.ee_pose()?.position;
        let joints = self.joints.joint_states(&query.joint_names)?;
        let object = match query.has_object {
            true => Some(ObjectState {
                pos: self.object.position()?,
                ..Default::default()
            }),
            false => None,
        };

        Ok(RawState {
            grip_pos,
            grip_velp: Vector3::zeros(),
            object,
            joint_pos: joints.iter().map(|j| j.position).collect(),
            joint_vel: joints.iter().map(|j| j.velocity).collect(),
        })
    }
}
