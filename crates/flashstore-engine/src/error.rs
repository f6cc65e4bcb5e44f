// ABOUTME: Fault classification for engine errors, decided once at the engine-access boundary.
// ABOUTME: Recoverable faults signal corrupted/exhausted in-memory state; everything else is terminal.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors raised by statement execution against the engine.
///
/// Classification happens exactly once, here, based on the SQLite primary
/// error code. Callers pattern-match on the variant (or call
/// [`EngineError::is_recoverable`]) and never inspect message text.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The in-memory database state is corrupted or exhausted. A reload
    /// from the last snapshot may clear the fault.
    #[error("recoverable engine fault: {0}")]
    Recoverable(#[source] rusqlite::Error),

    /// An ordinary statement error: bad SQL, constraint violation, missing
    /// table. Retrying cannot help and would mask real integrity problems.
    #[error("statement failed: {0}")]
    Statement(#[source] rusqlite::Error),
}

impl EngineError {
    /// Classify a raw SQLite error into recoverable or terminal.
    pub fn classify(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(cause, _) => match cause.code {
                ErrorCode::OutOfMemory
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase => EngineError::Recoverable(err),
                _ => EngineError::Statement(err),
            },
            _ => EngineError::Statement(err),
        }
    }

    /// True if a snapshot reload may clear this fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::Recoverable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            Some("injected".to_string()),
        )
    }

    #[test]
    fn out_of_memory_is_recoverable() {
        let err = EngineError::classify(sqlite_failure(rusqlite::ffi::SQLITE_NOMEM));
        assert!(err.is_recoverable(), "NOMEM should be recoverable: {}", err);
    }

    #[test]
    fn corruption_is_recoverable() {
        let err = EngineError::classify(sqlite_failure(rusqlite::ffi::SQLITE_CORRUPT));
        assert!(err.is_recoverable());

        let err = EngineError::classify(sqlite_failure(rusqlite::ffi::SQLITE_NOTADB));
        assert!(err.is_recoverable());
    }

    #[test]
    fn constraint_violation_is_terminal() {
        let err = EngineError::classify(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT));
        assert!(!err.is_recoverable());
        assert!(matches!(err, EngineError::Statement(_)));
    }

    #[test]
    fn non_sqlite_errors_are_terminal() {
        let err = EngineError::classify(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_recoverable());
    }
}
