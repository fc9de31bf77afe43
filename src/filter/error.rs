use thiserror::Error;

/// Rejected filter input; every variant renders as a 400 at the HTTP edge
#[derive(Error, Debug)]
pub enum FilterError {
    /// Not a field of the model, or a field that cannot be filtered on
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    #[error("Invalid paging: {0}")]
    Paging(String),
}
