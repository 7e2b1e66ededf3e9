//! Nullable cross-contract invoker: records calls and injects failures.

use ocl_store::{InterContractInvoker, InvokeError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One recorded cross-contract call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvokeRecord {
    pub target: String,
    pub channel: String,
    pub operation: String,
    pub args: Vec<Vec<u8>>,
}

/// Wraps an optional real invoker. Every call is recorded; operations marked
/// as failing return [`InvokeError::Transport`] without reaching the inner
/// invoker. With no inner invoker, successful calls return an empty payload.
pub struct NullInvoker {
    inner: Option<Arc<dyn InterContractInvoker>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<InvokeRecord>>,
}

impl NullInvoker {
    pub fn new() -> Self {
        Self {
            inner: None,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Forward successful calls to `inner`.
    pub fn wrapping(inner: Arc<dyn InterContractInvoker>) -> Self {
        Self {
            inner: Some(inner),
            ..Self::new()
        }
    }

    /// Make every call to `operation` fail until [`NullInvoker::heal`] is called.
    pub fn fail_operation(&self, operation: &str) {
        self.failing.lock().unwrap().insert(operation.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// All calls seen so far, in order.
    pub fn calls(&self) -> Vec<InvokeRecord> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls to a specific operation.
    pub fn calls_to(&self, operation: &str) -> Vec<InvokeRecord> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation)
            .collect()
    }
}

impl Default for NullInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl InterContractInvoker for NullInvoker {
    fn invoke(
        &self,
        target: &str,
        channel: &str,
        operation: &str,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>, InvokeError> {
        self.calls.lock().unwrap().push(InvokeRecord {
            target: target.to_string(),
            channel: channel.to_string(),
            operation: operation.to_string(),
            args: args.to_vec(),
        });
        if self.failing.lock().unwrap().contains(operation) {
            return Err(InvokeError::Transport(format!(
                "injected failure for {operation}"
            )));
        }
        match &self.inner {
            Some(inner) => inner.invoke(target, channel, operation, args),
            None => Ok(Vec::new()),
        }
    }
}
