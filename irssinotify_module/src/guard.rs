//! Failure boundary wrapped around every hook so nothing unwinds into the host.

use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::host::BouncerContext;

pub(crate) type BoxError = Box<dyn Error + Send + Sync>;

pub(crate) fn guarded<T>(
    ctx: &dyn BouncerContext,
    hook: &'static str,
    fallback: T,
    run: impl FnOnce() -> Result<T, BoxError>,
) -> T {
    debug!("TRACE: {}", hook);
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            report_failure(ctx, hook, err.as_ref());
            fallback
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("{} panicked: {}", hook, message);
            ctx.put_module(&format!("Failed with panic in {}: {}", hook, message));
            fallback
        }
    }
}

/// Writes the error and each of its sources to the module channel.
pub(crate) fn report_failure(ctx: &dyn BouncerContext, hook: &str, err: &(dyn Error + 'static)) {
    error!("{} failed: {}", hook, err);
    ctx.put_module(&format!("Failed with {}", err));
    let mut source = err.source();
    while let Some(cause) = source {
        ctx.put_module(&format!("  caused by: {}", cause));
        source = cause.source();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
