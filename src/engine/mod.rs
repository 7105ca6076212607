pub mod analytics;
pub mod assignment;
pub mod catalog;
pub mod lifecycle;
pub mod requests;

use tracing::warn;

use crate::access::{self, Caller, Operation};
use crate::error::AppError;
use crate::state::AppState;

pub(crate) fn gate(state: &AppState, caller: &Caller, operation: Operation) -> Result<(), AppError> {
    access::authorize(caller, operation).inspect_err(|_| {
        state
            .metrics
            .access_denied_total
            .with_label_values(&[operation.as_str()])
            .inc();
        warn!(
            subject = caller.subject(),
            operation = operation.as_str(),
            "access denied"
        );
    })
}
