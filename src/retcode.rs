// Operation outcomes for the sequencing API
//
// Hardware faults travel as Result<_, ActuatorError>; these codes cover the
// valid-but-vacuous and invalid-in-state cases that are not errors.

use crate::motor::ActuatorError;

/// Outcome of a sequencing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retcode {
    /// The operation took effect.
    Ok,
    /// The operation was valid but there was nothing to do
    /// (e.g. awaiting an already-idle sequence).
    NotApplicable,
    /// The operation is invalid in the current state
    /// (e.g. starting with an empty queue).
    Rejected,
    /// The capability is not provided by this robot variant.
    NotImplemented,
}

impl Retcode {
    pub fn is_ok(self) -> bool {
        self == Retcode::Ok
    }
}

impl From<&ActuatorError> for Retcode {
    fn from(err: &ActuatorError) -> Self {
        match err {
            ActuatorError::Unsupported { .. } => Retcode::NotImplemented,
            _ => Retcode::Rejected,
        }
    }
}
