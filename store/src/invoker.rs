//! Cross-contract invocation.

use crate::InvokeError;

/// Transport through which one contract calls an operation on another.
///
/// The call is part of the caller's transaction scope: an `Err` must abort the
/// enclosing operation.
pub trait InterContractInvoker: Send + Sync {
    fn invoke(
        &self,
        target: &str,
        channel: &str,
        operation: &str,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>, InvokeError>;
}
