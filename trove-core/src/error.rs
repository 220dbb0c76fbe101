use crate::{Error, ValueKind};

/// Failure kinds raised by the engine.
///
/// Every fallible operation returns an [`anyhow::Error`]; the kind travels inside it and
/// can be recovered with `error.downcast_ref::<OrmError>()`, even after context was added.
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    /// The model cannot be turned into a table.
    #[error("Model `{model}` cannot be mapped to a table: {reason}")]
    Schema { model: String, reason: String },
    /// The value type has no column mapping.
    #[error("Type `{0}` has no column mapping")]
    UnsupportedType(String),
    /// A NULL cell was read into a field that cannot hold it.
    #[error("Column `{column}` is NULL but the field it maps to is not nullable")]
    NullConstraintViolation { column: String },
    /// The row has no column with this name (or position).
    #[error("Column `{column}` is not present in the row")]
    ColumnNotFound { column: String },
    /// A non-null cell could not be coerced to the kind of the field.
    #[error("Column `{column}` cannot be read as {expected:?}: {found}")]
    TypeMismatch {
        column: String,
        expected: ValueKind,
        found: String,
    },
    #[error("Model `{model}` does not declare a primary key")]
    NoPrimaryKey { model: String },
    #[error("Model `{model}` has no field named `{field}`")]
    NoSuchField { model: String, field: String },
    #[error("Could not instantiate model `{model}`")]
    Instantiation { model: String },
    #[error("Could not write field `{field}` of model `{model}`")]
    FieldAccess { model: String, field: String },
    /// The store rejected a row because a unique or primary key already holds its value.
    #[error("Duplicate key: {message}")]
    DuplicateKey { message: String },
    /// The store rejected a row because of any other constraint.
    #[error("Constraint violation: {message}")]
    Constraint { message: String },
    /// Two model types claim the same table.
    #[error("Table `{table}` is already bound to model `{existing}`, cannot bind it to `{model}`")]
    TableNameCollision {
        table: String,
        existing: String,
        model: String,
    },
    #[error("The operation was cancelled before it started")]
    Cancelled,
    #[error("The worker pool is shut down")]
    PoolShutdown,
}

impl OrmError {
    /// Kind carried by `error`, if any.
    pub fn of(error: &Error) -> Option<&OrmError> {
        error.downcast_ref::<OrmError>()
    }
}

/// Process-wide sink for failures that are reported instead of returned.
pub fn report_error(error: &Error) {
    log::error!("{:#}", error);
}
