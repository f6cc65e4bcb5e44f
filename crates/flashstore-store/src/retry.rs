// ABOUTME: Bounded fault-recovery retry policy wrapping every engine access.
// ABOUTME: Reloads the engine from the snapshot on recoverable faults; terminal errors propagate at once.

use flashstore_engine::{Engine, EngineError};

use crate::error::StoreError;
use crate::lifecycle::Lifecycle;

/// Run one operation against the engine with bounded fault recovery.
///
/// On a recoverable fault the engine is replaced by a fresh instance loaded
/// from the snapshot and the operation is retried, up to `max_retries`
/// additional attempts; the last fault is returned when they are exhausted.
/// Terminal errors propagate immediately with zero reload attempts. If the
/// reload itself fails, the original fault is wrapped in
/// [`StoreError::RecoveryFailed`].
///
/// Every store path, reads included, goes through this same bounded loop.
pub(crate) fn run_with_recovery<T>(
    engine: &mut Engine,
    lifecycle: &Lifecycle,
    max_retries: u32,
    op: impl Fn(&Engine) -> Result<T, EngineError>,
) -> Result<T, StoreError> {
    let mut reloads = 0;
    loop {
        match op(engine) {
            Ok(value) => return Ok(value),
            Err(fault) if fault.is_recoverable() => {
                tracing::warn!(
                    attempt = reloads + 1,
                    max_attempts = max_retries + 1,
                    error = %fault,
                    "recoverable engine fault detected"
                );
                if reloads >= max_retries {
                    return Err(StoreError::Engine(fault));
                }
                match lifecycle.reload() {
                    Ok(fresh) => {
                        *engine = fresh;
                        reloads += 1;
                    }
                    Err(source) => {
                        tracing::error!(error = %source, "engine reload failed during recovery");
                        return Err(StoreError::RecoveryFailed { fault, source });
                    }
                }
            }
            Err(err) => return Err(StoreError::Engine(err)),
        }
    }
}
