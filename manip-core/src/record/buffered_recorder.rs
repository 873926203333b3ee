use super::{Record, Recorder};

/// Keeps every written [`Record`] in memory, in write order.
///
/// Handy for inspecting the step records of a few episodes, e.g., object heights and
/// reward terms of an evaluation run.
#[derive(Default)]
pub struct BufferedRecorder {
    records: Vec<Record>,
}

impl BufferedRecorder {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in write order.
    pub fn iter(&self) -> std::slice::Iter<Record> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Recorder for BufferedRecorder {
    fn write(&mut self, record: Record) {
        self.records.push(record);
    }
}
