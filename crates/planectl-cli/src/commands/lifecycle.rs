//! Lifecycle console commands

use clap::{Args, Subcommand};
use planectl_watch::reconcile::LifecycleReconciler;
use planectl_watch::reconcile::lifecycle::render_page;
use planectl_api::client::Params;

use crate::display::print_json;
use crate::error::Result;

use super::{Context, param, run_stream};

/// Query filters shared by the snapshot listing and the stream.
#[derive(Args)]
pub struct LifecycleFilters {
    /// Resume snapshots from the supplied cursor
    #[arg(long)]
    cursor: Option<i64>,

    /// Maximum number of workspaces to return
    #[arg(long)]
    limit: Option<u32>,

    /// Filter workspaces by lifecycle state
    #[arg(long)]
    lifecycle_state: Option<String>,

    /// Filter by workspace owner
    #[arg(long)]
    owner_id: Option<i64>,

    /// Filter by an exact workspace key
    #[arg(long)]
    workspace_key: Option<String>,

    /// Case-insensitive search across workspace names
    #[arg(long)]
    workspace_search: Option<String>,

    /// Filter promotion runs by lane identifier
    #[arg(long)]
    promotion_lane: Option<String>,

    /// Filter snapshots by blended severity classification
    #[arg(long)]
    severity: Option<String>,

    /// Bound the number of recent remediation runs per workspace
    #[arg(long)]
    run_limit: Option<u32>,
}

impl LifecycleFilters {
    fn params(&self) -> Params {
        let mut params = Vec::new();
        param(&mut params, "cursor", self.cursor);
        param(&mut params, "limit", self.limit);
        param(&mut params, "lifecycle_state", self.lifecycle_state.clone());
        param(&mut params, "owner_id", self.owner_id);
        param(&mut params, "workspace_key", self.workspace_key.clone());
        param(
            &mut params,
            "workspace_search",
            self.workspace_search.clone(),
        );
        param(&mut params, "promotion_lane", self.promotion_lane.clone());
        param(&mut params, "severity", self.severity.clone());
        param(&mut params, "run_limit", self.run_limit);
        params
    }
}

#[derive(Subcommand)]
pub enum LifecycleCommands {
    /// List lifecycle console snapshots with promotion automation context
    List {
        #[command(flatten)]
        filters: LifecycleFilters,
    },

    /// Stream lifecycle console snapshots and deltas
    Watch {
        #[command(flatten)]
        filters: LifecycleFilters,

        /// Heartbeat interval for SSE keep-alive messages
        #[arg(long)]
        heartbeat_ms: Option<u64>,
    },
}

pub async fn run(ctx: &Context, command: LifecycleCommands) -> Result<()> {
    match command {
        LifecycleCommands::List { filters } => list(ctx, &filters).await,
        LifecycleCommands::Watch {
            filters,
            heartbeat_ms,
        } => {
            let mut params = filters.params();
            param(&mut params, "heartbeat_ms", heartbeat_ms);
            run_stream(
                ctx,
                "/api/console/lifecycle/stream",
                params,
                LifecycleReconciler::new(),
                None,
            )
            .await
        }
    }
}

async fn list(ctx: &Context, filters: &LifecycleFilters) -> Result<()> {
    let page = ctx
        .client
        .get("/api/console/lifecycle", &filters.params())
        .await?;
    if ctx.json {
        print_json(&page);
        return Ok(());
    }
    for line in render_page(&page) {
        println!("{line}");
    }
    Ok(())
}
