//! Simulated backend.
mod backend;
mod kinematic;
mod scene;
pub use backend::{SimulatedBackend, SimulatedBackendConfig};
pub use kinematic::{KinematicScene, KinematicSceneConfig, KinematicState};
pub use scene::PhysicsScene;
