//! Command execution helpers
//!
//! Every inbound command runs through [`execute_logged`] so timing and
//! failure labels are logged the same way.

use std::future::Future;
use std::time::Instant;

use linkguard_domain::Result as DomainResult;

use crate::utils::logging::{error_label, log_command_execution};

/// Execute a command, logging its duration and outcome.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn my_command(ctx: &AppContext) -> Result<MyResponse> {
///     execute_logged("my_module::my_command", || async {
///         ctx.tracker.do_something().await.map_err(Into::into)
///     })
///     .await
/// }
/// ```
pub async fn execute_logged<F, Fut, T>(command_name: &str, command_fn: F) -> DomainResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();
    let result = command_fn().await;

    log_command_execution(
        command_name,
        start.elapsed(),
        result.is_ok(),
        result.as_ref().err().map(error_label),
    );
    result
}

#[cfg(test)]
mod tests {
    use linkguard_domain::LinkGuardError;

    use super::*;

    #[tokio::test]
    async fn result_passes_through_unchanged() {
        let ok = execute_logged("test::ok", || async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: DomainResult<()> = execute_logged("test::err", || async {
            Err(LinkGuardError::NotFound("kalshi".into()))
        })
        .await;
        assert_eq!(err, Err(LinkGuardError::NotFound("kalshi".into())));
    }
}
