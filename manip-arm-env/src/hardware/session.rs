//! Process-wide middleware session.
use chrono::{DateTime, Local};
use log::info;
use std::sync::Mutex;

static SESSION: Mutex<Option<SessionInfo>> = Mutex::new(None);

/// A running session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    /// Name under which this process is registered.
    pub node_name: String,

    /// Time of initialization.
    pub started_at: DateTime<Local>,
}

/// Initializes the session.
///
/// Idempotent: if a session is already running, it is returned unchanged and
/// `node_name` is ignored.
pub fn init(node_name: &str) -> SessionInfo {
    let mut session = SESSION.lock().unwrap_or_else(|e| e.into_inner());
    match session.as_ref() {
        Some(info) => {
            info!("Session {} has already been initialized", info.node_name);
            info.clone()
        }
        None => {
            let info = SessionInfo {
                node_name: node_name.to_string(),
                started_at: Local::now(),
            };
            info!("Initialized session {}", node_name);
            *session = Some(info.clone());
            info
        }
    }
}

/// The running session, if any.
pub fn current() -> Option<SessionInfo> {
    SESSION.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Shuts the session down. Returns `false` if no session was running.
pub fn shutdown() -> bool {
    let mut session = SESSION.lock().unwrap_or_else(|e| e.into_inner());
    match session.take() {
        Some(info) => {
            info!("Shut down session {}", info.node_name);
            true
        }
        None => false,
    }
}
