//! Hardware backend.
//!
//! The physical arm is reached through three channels:
//!
//! * an arm service answering [`ArmRequest`]s, every call bounded by a timeout,
//! * a joint state feed of [`JointStateMsg`]s, applied to a [`HardwareStateCache`],
//! * an object pose feed of [`ObjectPoseMsg`]s, stored in an [`ObjectPoseCache`].
//!
//! Feeds are consumed by subscriber threads; the control loop only reads the caches.
mod backend;
mod cache;
mod feed;
mod loopback;
mod service;
pub mod session;
pub use backend::{HardwareBackend, HardwareConfig, HardwareLink};
pub use cache::{HardwareStateCache, JointSnapshot, ObjectPoseCache};
pub use feed::{
    spawn_joint_state_subscriber, spawn_object_pose_subscriber, JointStateMsg, ObjectPoseMsg,
};
pub use loopback::{LoopbackArm, LoopbackConfig};
pub use service::{arm_service_channel, ArmCall, ArmRequest, ArmResponse, ArmServiceClient};
