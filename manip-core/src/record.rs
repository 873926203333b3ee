//! Types and traits for recording step and evaluation diagnostics.
//!
//! * [`Record`] - A container of named values
//! * [`RecordValue`] - The type of a value stored in a [`Record`]
//! * [`Recorder`] - Destination of records
//! * [`BufferedRecorder`] - Keeps records in memory, e.g., for inspecting an episode
//!
//! ```rust
//! use manip_core::record::{Record, RecordValue};
//!
//! // following values are obtained with some process in reality
//! let step = 1;
//! let grip_pos = vec![0.80, 0.01, 0.79];
//! let reward = -0.12f32;
//!
//! let mut record = Record::empty();
//! record.insert("step", RecordValue::Scalar(step as f32));
//! record.insert("reward", RecordValue::Scalar(reward));
//! record.insert("grip_pos", RecordValue::Array1(grip_pos));
//! ```
mod base;
mod buffered_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use recorder::Recorder;
