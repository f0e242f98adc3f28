use thiserror::Error;

/// A fatal error raised while executing a program.
///
/// There is no in-language recovery: a fault stops the whole run, keeping whatever output was
/// produced before it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuntimeFault {
    #[error("label `{label}` does not exist in `{container}`")]
    MissingLabel { container: String, label: String },
    #[error("`{name}` has no value")]
    UnboundSymbol { name: String },
    #[error("no host function registered for `{name}`")]
    MissingHostFunction { name: String },
    #[error("cannot cast `{from}` to `{to}`")]
    InvalidCast { from: String, to: String },
    #[error("variant {tag} of `{ty}` is not active")]
    InactivePayload { ty: String, tag: i64 },
    #[error("field `{field}` of `{class}` is uninitialized")]
    UninitializedField { class: String, field: String },
    #[error("`{op}` expected {expected}, found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("`{function}` finished without returning a value")]
    MissingReturnValue { function: String },
    #[error("a future or generator was resumed while it was already running")]
    ReentrantTask,
    #[error("the future has no value yet")]
    NotReady,
    #[error("the global initializer suspended")]
    InitializerBlocked,
    #[error("no routine named `{name}`")]
    NoEntryRoutine { name: String },
    #[error("no routine or function named `{name}`")]
    UnknownRoutine { name: String },
    #[error("routines did not finish within {rounds} rounds")]
    RoundLimitExceeded { rounds: u64 },
    #[error("{function}: {message}")]
    Host { function: String, message: String },
}

impl RuntimeFault {
    pub fn host(function: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeFault::Host {
            function: function.into(),
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(op: &'static str, expected: &'static str, found: &crate::Value) -> Self {
        RuntimeFault::TypeMismatch {
            op,
            expected,
            found: format!("{found:?}"),
        }
    }
}
