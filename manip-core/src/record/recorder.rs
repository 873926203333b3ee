use super::Record;

/// Destination of step and evaluation records.
pub trait Recorder {
    /// Takes ownership of `record`.
    fn write(&mut self, record: Record);
}
