//! Marketplace commands

use clap::Subcommand;
use planectl_watch::reconcile::MarketplaceReconciler;

use crate::display::{cell, cell_or, objects, print_json, render_table};
use crate::error::Result;

use super::{Context, run_stream};

#[derive(Subcommand)]
pub enum MarketplaceCommands {
    /// List marketplace offerings
    List,

    /// Stream provider marketplace events in real time
    Watch {
        /// Provider identifier (UUID)
        provider_id: String,

        /// Stop after emitting N events (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        max_events: u64,
    },
}

pub async fn run(ctx: &Context, command: MarketplaceCommands) -> Result<()> {
    match command {
        MarketplaceCommands::List => list(ctx).await,
        MarketplaceCommands::Watch {
            provider_id,
            max_events,
        } => {
            let budget = (max_events > 0).then_some(max_events);
            run_stream(
                ctx,
                &format!("/api/marketplace/providers/{provider_id}/events/stream"),
                Vec::new(),
                MarketplaceReconciler::new(ctx.use_color()),
                budget,
            )
            .await
        }
    }
}

async fn list(ctx: &Context) -> Result<()> {
    let data = ctx.client.get("/api/marketplace", &Vec::new()).await?;
    if ctx.json {
        print_json(&data);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = objects(&data)
        .map(|item| {
            vec![
                cell(item.get("id")),
                cell(item.get("name")),
                cell(item.get("tier")),
                cell_or(
                    item.get("status").or_else(|| item.get("state")),
                    "unknown",
                ),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["id", "name", "tier", "status"], &rows)
    );
    Ok(())
}
