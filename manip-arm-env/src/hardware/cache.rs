//! Caches filled by feed subscribers and read by the control loop.
use super::feed::{JointStateMsg, ObjectPoseMsg};
use crate::{
    error::ArmEnvError,
    types::JointState,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use nalgebra::Vector3;
use std::{
    collections::HashMap,
    sync::{Condvar, Mutex, MutexGuard},
    time::Duration,
};

/// A consistent copy of [`HardwareStateCache`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointSnapshot {
    /// Latest state of each joint.
    pub joints: HashMap<String, JointState>,

    /// Number of messages applied so far.
    pub n_messages: u64,

    /// Timestamp of the latest message.
    pub stamp: Option<DateTime<Utc>>,
}

/// Latest joint states, keyed by joint name.
///
/// A message is applied under a single lock acquisition and a snapshot is copied
/// under a single lock acquisition, so a reader never sees a mix of two messages.
#[derive(Default)]
pub struct HardwareStateCache {
    inner: Mutex<JointSnapshot>,
    ready: Condvar,
}

impl HardwareStateCache {
    /// Constructs an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JointSnapshot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies a joint state message.
    ///
    /// Values are taken by index; a joint missing velocity or effort entries keeps its
    /// previous values for those fields.
    pub fn update(&self, msg: &JointStateMsg) {
        let mut inner = self.lock();
        for (ix, name) in msg.names.iter().enumerate() {
            let joint = inner.joints.entry(name.clone()).or_default();
            if let Some(p) = msg.positions.get(ix) {
                joint.position = *p;
            }
            if let Some(v) = msg.velocities.get(ix) {
                joint.velocity = *v;
            }
            if let Some(e) = msg.efforts.get(ix) {
                joint.effort = *e;
            }
        }
        inner.n_messages += 1;
        inner.stamp = Some(msg.timestamp);
        self.ready.notify_all();
    }

    /// Copies the whole cache.
    pub fn snapshot(&self) -> JointSnapshot {
        self.lock().clone()
    }

    /// States of the given joints, in the given order, from one snapshot.
    pub fn joint_states(&self, names: &[String]) -> Result<Vec<JointState>> {
        let inner = self.lock();
        names
            .iter()
            .map(|name| match inner.joints.get(name) {
                Some(joint) => Ok(*joint),
                None => {
                    let e = ArmEnvError::DataUnavailable(format!("joint state of {}", name));
                    Err(anyhow::Error::from(e))
                }
            })
            .collect()
    }

    /// Number of messages applied so far.
    pub fn n_messages(&self) -> u64 {
        self.lock().n_messages
    }

    /// Blocks until at least one message has been applied or `timeout` elapses.
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        let inner = self.lock();
        let (inner, _) = self
            .ready
            .wait_timeout_while(inner, timeout, |s| s.n_messages == 0)
            .unwrap_or_else(|e| e.into_inner());
        inner.n_messages > 0
    }
}

/// Latest object position.
#[derive(Default)]
pub struct ObjectPoseCache {
    inner: Mutex<Option<ObjectPoseMsg>>,
    ready: Condvar,
}

impl ObjectPoseCache {
    /// Constructs an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ObjectPoseMsg>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores a message.
    pub fn update(&self, msg: &ObjectPoseMsg) {
        *self.lock() = Some(msg.clone());
        self.ready.notify_all();
    }

    /// Blocks until a message has been stored or `timeout` elapses.
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        let inner = self.lock();
        let (inner, _) = self
            .ready
            .wait_timeout_while(inner, timeout, |msg| msg.is_none())
            .unwrap_or_else(|e| e.into_inner());
        inner.is_some()
    }

    /// The latest object position.
    ///
    /// Fails with [`ArmEnvError::DataUnavailable`] before the first message and while
    /// the reported height is not positive, which the detector uses for "no object".
    pub fn position(&self) -> Result<Vector3<f32>> {
        let inner = self.lock();
        match inner.as_ref() {
            Some(msg) if msg.position.z > 0.0 => Ok(msg.position),
            Some(_) => {
                warn!("No object position, check the object");
                Err(ArmEnvError::DataUnavailable("object is not detected".into()).into())
            }
            None => Err(ArmEnvError::DataUnavailable("no object pose received".into()).into()),
        }
    }
}
