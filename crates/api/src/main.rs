//! LinkGuard - connection state and alert suppression monitor
//!
//! Operator entry point over the shared store:
//! - `linkguard status` prints the monitor health summary (default)
//! - `linkguard states` prints every persisted connection record
//! - `linkguard cleanup [hours]` removes records older than `hours` (24)

use anyhow::{bail, Context};
use linkguard_api::{cleanup_stale_states, get_all_connection_states, get_monitor_health};

#[tokio::main]
#[allow(clippy::print_stdout)]
async fn main() -> anyhow::Result<()> {
    linkguard_api::init_logging();

    let ctx = linkguard_api::global_context().await.context("failed to initialise LinkGuard")?;

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("status") => {
            let health = get_monitor_health(&ctx).await;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Some("states") => {
            let states = get_all_connection_states(&ctx).await?;
            println!("{}", serde_json::to_string_pretty(&states)?);
        }
        Some("cleanup") => {
            let hours = args
                .next()
                .map(|raw| raw.parse::<u64>().with_context(|| format!("invalid hours: {raw}")))
                .transpose()?;
            let removed = cleanup_stale_states(&ctx, hours).await?;
            println!("removed {removed} stale connection states");
        }
        Some(other) => bail!("unknown command '{other}'; expected status, states or cleanup"),
    }

    ctx.shutdown().await?;
    Ok(())
}
