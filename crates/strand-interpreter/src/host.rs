//! Host callables backing `extern` functions.

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use strand_ir::ReturnStatus;

use crate::error::RuntimeFault;
use crate::value::Value;

/// A host callable.
///
/// It receives the calling context, the slot for its result and the evaluated arguments.
/// Returning `ReturnStatus::Blocked` suspends the calling routine; the call is retried with
/// freshly evaluated arguments on the next drive.
pub type HostFn =
    dyn Fn(&mut HostContext<'_>, &mut Option<Value>, &[Value]) -> Result<ReturnStatus, RuntimeFault>;

/// What a host callable can see of the running VM.
pub struct HostContext<'a> {
    pub(crate) routine: &'a str,
    pub(crate) output: &'a mut String,
    pub(crate) echo: bool,
}

impl HostContext<'_> {
    /// Name of the routine (or function) being driven.
    pub fn routine(&self) -> &str {
        self.routine
    }

    /// Appends to the VM's output buffer.
    pub fn write(&mut self, text: &str) {
        self.output.push_str(text);
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }

    pub fn output(&self) -> &str {
        self.output
    }
}

/// Host callables keyed by the full name of the extern they implement.
#[derive(Clone, Default)]
pub struct HostRegistry {
    fns: FxHashMap<String, Rc<HostFn>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut HostContext<'_>, &mut Option<Value>, &[Value]) -> Result<ReturnStatus, RuntimeFault>
            + 'static,
    {
        self.fns.insert(name.into(), Rc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Rc<HostFn>> {
        self.fns.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }
}

impl fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HostRegistry").field("fns", &names).finish()
    }
}
