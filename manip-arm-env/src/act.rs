//! Action of [`ArmEnv`](crate::ArmEnv).
use manip_core::Act;
use ndarray::Array1;

/// A continuous action: three end-effector position deltas followed by auxiliary
/// components.
///
/// Components are expected in `[-1, 1]`; values outside are clamped by
/// [`ActuatorCommandMapper`](crate::ActuatorCommandMapper).
#[derive(Clone, Debug, PartialEq)]
pub struct ArmAct(Array1<f32>);

impl ArmAct {
    /// Constructs an action.
    pub fn new(a: Array1<f32>) -> Self {
        Self(a.as_standard_layout().into_owned())
    }

    /// Returns the components.
    pub fn as_slice(&self) -> &[f32] {
        // Contiguous since construction.
        self.0.as_slice().unwrap_or(&[])
    }

    /// Returns the underlying array.
    pub fn array(&self) -> &Array1<f32> {
        &self.0
    }
}

impl Act for ArmAct {
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<f32>> for ArmAct {
    fn from(v: Vec<f32>) -> Self {
        Self(Array1::from(v))
    }
}

impl From<ArmAct> for Array1<f32> {
    fn from(value: ArmAct) -> Self {
        value.0
    }
}
