use std::fmt;

/// Lifecycle state of a [`Task`](super::Task).
///
/// `Created`/`Paused` are waiting, `Connecting`/`Running` are starting.
/// `Suspend` is parked until an explicit resume; the scheduler never
/// re-admits it on its own.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Created = 0,
    Connecting = 1,
    Running = 2,
    Paused = 3,
    Finished = 4,
    Cancel = 5,
    Failed = 6,
    Suspend = 7,
}

impl Status {
    pub(crate) fn from_u8(v: u8) -> Status {
        match v {
            0 => Status::Created,
            1 => Status::Connecting,
            2 => Status::Running,
            3 => Status::Paused,
            4 => Status::Finished,
            5 => Status::Cancel,
            6 => Status::Failed,
            _ => Status::Suspend,
        }
    }

    pub fn is_waiting(self) -> bool {
        matches!(self, Status::Created | Status::Paused)
    }

    pub fn is_starting(self) -> bool {
        matches!(self, Status::Connecting | Status::Running)
    }

    pub fn is_in_queue(self) -> bool {
        self.is_waiting() || self.is_starting()
    }

    pub fn is_terminated(self) -> bool {
        matches!(self, Status::Finished | Status::Failed | Status::Cancel)
    }

    pub fn is_lifecycle_over(self) -> bool {
        matches!(self, Status::Finished | Status::Cancel)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Created => "created",
            Status::Connecting => "connecting",
            Status::Running => "running",
            Status::Paused => "paused",
            Status::Finished => "finished",
            Status::Cancel => "cancelled",
            Status::Failed => "failed",
            Status::Suspend => "suspended",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
