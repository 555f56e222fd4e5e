use crate::GateId;

/// Errors returned by operations on a [`crate::Graph`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// A handle did not name a live gate, an index was out of range
    /// or an argument list was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Growing a slot array or link collection failed.
    #[error("out of memory")]
    OutOfMemory,
    /// The gate has at least one unbound input slot.
    #[error("gate {gate} is not ready: some input is not connected")]
    NotReady { gate: GateId },
    /// The gate depends on its own output.
    #[error("cycle detected at gate {gate}")]
    CycleDetected { gate: GateId },
}

impl GateError {
    pub(crate) fn unknown_gate(gate: GateId) -> Self {
        GateError::InvalidArgument(format!("unknown gate {gate}"))
    }

    pub(crate) fn slot_out_of_range(gate: GateId, slot: usize, count: usize) -> Self {
        GateError::InvalidArgument(format!(
            "input {slot} out of range for gate {gate} with {count} inputs"
        ))
    }
}

impl From<std::collections::TryReserveError> for GateError {
    fn from(_: std::collections::TryReserveError) -> Self {
        GateError::OutOfMemory
    }
}
