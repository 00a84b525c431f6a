//! Command implementations
//!
//! One module per top-level subcommand. Every watch command funnels
//! through [`run_stream`], which wires the subscription to the watch
//! loop with ctrl-c as the cancellation future.

pub mod lifecycle;
pub mod marketplace;
pub mod policy;
pub mod remediation;
pub mod trust;

use planectl_api::ApiClient;
use planectl_api::client::Params;
use planectl_watch::watch::{WatchOptions, run_watch};
use planectl_watch::Reconciler;
use serde_json::Value;

use crate::error::{CliError, Result};

/// Shared state handed to every command.
pub struct Context {
    pub client: ApiClient,
    pub json: bool,
}

impl Context {
    /// Color only on an interactive terminal and never in JSON mode.
    pub fn use_color(&self) -> bool {
        !self.json && console::Term::stdout().is_term()
    }
}

/// Append a query parameter when the value is present.
pub(crate) fn param<T: ToString>(params: &mut Params, key: &str, value: Option<T>) {
    if let Some(value) = value {
        params.push((key.to_string(), value.to_string()));
    }
}

/// Parse a user-supplied JSON flag value.
pub(crate) fn parse_json_flag(value: &str, flag: &str) -> Result<Value> {
    serde_json::from_str(value)
        .map_err(|e| CliError::input(format!("Invalid JSON for {flag}: {e}")))
}

/// Subscribe to a stream endpoint and drive it until it ends, the
/// operator interrupts, or the emitted-event budget is spent.
pub(crate) async fn run_stream<R: Reconciler>(
    ctx: &Context,
    path: &str,
    params: Params,
    mut reconciler: R,
    max_events: Option<u64>,
) -> Result<()> {
    let subscription = ctx.client.subscribe(path, &params).await?;
    let options = WatchOptions {
        json: ctx.json,
        max_events,
    };
    let mut stdout = std::io::stdout();
    let outcome = run_watch(
        subscription,
        &mut reconciler,
        &mut stdout,
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
        &options,
    )
    .await?;
    tracing::debug!(?outcome, path, "watch finished");
    Ok(())
}
