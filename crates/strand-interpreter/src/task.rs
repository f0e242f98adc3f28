//! Futures, generators and event listeners: retained frames driven on demand.

use crate::frame::Frame;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Future,
    Generator,
}

pub(crate) enum TaskState {
    /// The body has not finished; it may not have started yet.
    Pending(Box<Frame>),
    /// Taken out for driving. Seeing this again means the task re-entered itself.
    Running,
    /// A future's result, or the marker of an exhausted generator.
    Done(Value),
    /// An event listener that no emit has completed yet.
    Listening,
}

pub struct Task {
    pub(crate) kind: TaskKind,
    pub(crate) state: TaskState,
}

impl Task {
    pub(crate) fn future(frame: Frame) -> Self {
        Task {
            kind: TaskKind::Future,
            state: TaskState::Pending(Box::new(frame)),
        }
    }

    pub(crate) fn generator(frame: Frame) -> Self {
        Task {
            kind: TaskKind::Generator,
            state: TaskState::Pending(Box::new(frame)),
        }
    }

    pub(crate) fn listener() -> Self {
        Task {
            kind: TaskKind::Future,
            state: TaskState::Listening,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, TaskState::Done(_))
    }
}

/// One pull from a generator.
#[derive(Debug, PartialEq)]
pub(crate) enum GeneratorStep {
    Item(Value),
    Exhausted,
    Blocked,
}
