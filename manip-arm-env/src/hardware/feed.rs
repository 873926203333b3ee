//! Push-based feeds of the physical arm and their subscribers.
use super::cache::{HardwareStateCache, ObjectPoseCache};
use anyhow::Result;
use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use log::{debug, trace};
use nalgebra::Vector3;
use std::{sync::Arc, thread::JoinHandle};

/// A joint state message.
///
/// `positions`, `velocities` and `efforts` are indexed like `names` and may be
/// shorter than it.
#[derive(Debug, Clone, PartialEq)]
pub struct JointStateMsg {
    /// Time of measurement.
    pub timestamp: DateTime<Utc>,

    /// Joint names.
    pub names: Vec<String>,

    /// Joint positions.
    pub positions: Vec<f32>,

    /// Joint velocities.
    pub velocities: Vec<f32>,

    /// Joint efforts.
    pub efforts: Vec<f32>,
}

/// An object position message from the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPoseMsg {
    /// Time of detection.
    pub timestamp: DateTime<Utc>,

    /// Position, with a non-positive height when no object is detected.
    pub position: Vector3<f32>,
}

/// Spawns a thread applying joint state messages to `cache` until the feed is closed.
pub fn spawn_joint_state_subscriber(
    feed: Receiver<JointStateMsg>,
    cache: Arc<HardwareStateCache>,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("joint-state-subscriber".into())
        .spawn(move || {
            for msg in feed.iter() {
                trace!("joint state: {:?}", msg);
                cache.update(&msg);
            }
            debug!("Joint state feed closed");
        })?;
    Ok(handle)
}

/// Spawns a thread storing object pose messages in `cache` until the feed is closed.
pub fn spawn_object_pose_subscriber(
    feed: Receiver<ObjectPoseMsg>,
    cache: Arc<ObjectPoseCache>,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("object-pose-subscriber".into())
        .spawn(move || {
            for msg in feed.iter() {
                trace!("object pose: {:?}", msg);
                cache.update(&msg);
            }
            debug!("Object pose feed closed");
        })?;
    Ok(handle)
}
