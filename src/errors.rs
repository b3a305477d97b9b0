use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Error type shared by every ledger core service.
///
/// Business-rule violations are detected before any mutation, so a returned
/// error always means the unit of work was rolled back with no partial
/// effect. `Transient` is the only class a caller may retry blindly.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(
        "Insufficient stock at warehouse {warehouse} for part {part_id}{}: available {available}, requested {requested}",
        lot_label(.lot_number)
    )]
    InsufficientStock {
        warehouse: String,
        part_id: Uuid,
        lot_number: Option<String>,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Insufficient quantity in lot {lot_number}: available {available}, requested {requested}")]
    InsufficientQuantity {
        lot_number: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Ledger entry {0} is already canceled")]
    AlreadyCanceled(Uuid),

    #[error("Lots reference different parts: {0}")]
    PartMismatch(String),

    #[error("No active sequence rule for type '{0}'")]
    RuleNotFound(String),

    #[error("Transient storage conflict, safe to retry: {0}")]
    Transient(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

fn lot_label(lot: &Option<String>) -> String {
    match lot {
        Some(number) => format!(" lot {}", number),
        None => String::new(),
    }
}

impl ServiceError {
    /// Classifies a `DbErr` so that lock-wait timeouts and serialization
    /// conflicts surface as retryable `Transient` errors instead of opaque
    /// database failures.
    pub fn db_error(err: DbErr) -> Self {
        let message = err.to_string();
        let lowered = message.to_lowercase();
        if lowered.contains("lock")
            || lowered.contains("deadlock")
            || lowered.contains("serialization")
            || lowered.contains("could not serialize")
            || lowered.contains("timed out")
        {
            ServiceError::Transient(message)
        } else {
            ServiceError::DatabaseError(err)
        }
    }

    /// True when the whole operation may be re-submitted as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Transient(_))
    }
}

/// Unwraps sea-orm's transaction error wrapper back into a `ServiceError`.
impl From<sea_orm::TransactionError<ServiceError>> for ServiceError {
    fn from(err: sea_orm::TransactionError<ServiceError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            sea_orm::TransactionError::Transaction(service_err) => service_err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn insufficient_stock_reports_coordinate_and_amounts() {
        let part_id = Uuid::new_v4();
        let err = ServiceError::InsufficientStock {
            warehouse: "WH1".to_string(),
            part_id,
            lot_number: Some("LOT-001".to_string()),
            available: dec!(70),
            requested: dec!(100),
        };
        let message = err.to_string();
        assert!(message.contains("WH1"));
        assert!(message.contains("LOT-001"));
        assert!(message.contains("70"));
        assert!(message.contains("100"));
    }

    #[test]
    fn lock_timeouts_classify_as_transient() {
        let err = ServiceError::db_error(DbErr::Custom(
            "Lock wait timeout exceeded; try restarting transaction".to_string(),
        ));
        assert!(err.is_retryable());

        let err = ServiceError::db_error(DbErr::Custom("duplicate key value".to_string()));
        assert!(!err.is_retryable());
    }
}
