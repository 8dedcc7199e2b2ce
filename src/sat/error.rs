use thiserror::Error;

/// Caller-attributable failure modes for the public `Solver` API.
///
/// Internal consistency violations (arena corruption, watcher list
/// desynchronization, ...) are not represented here: those stay
/// `debug_assert!`/`panic!` as they are bugs in the solver itself, not
/// something a caller can recover from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("variable index {var} out of range (solver has {n_vars} variables)")]
    VarOutOfRange { var: u32, n_vars: usize },

    #[error("parameter '{name}' out of range: {value}")]
    ParamOutOfRange { name: &'static str, value: String },

    #[error("operation requires solver state '{expected}'")]
    WrongState { expected: &'static str },
}

pub type SolverResult<T> = Result<T, SolverError>;
