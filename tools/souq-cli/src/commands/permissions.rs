//! Permission reconciliation commands.

use anyhow::{Context as _, Result};

use souq_auth::PermissionReconciler;
use souq_server::ROUTES;

use super::{PermissionsArgs, PermissionsCommand};
use crate::context::Context;

pub async fn run(args: PermissionsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        PermissionsCommand::Sync => sync(ctx).await,
        PermissionsCommand::Required => required(ctx),
    }
}

async fn sync(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    if config.database.is_memory() {
        ctx.output
            .warn("database.url is in-memory; the reconciled permissions are discarded on exit");
    }

    let spinner = ctx.output.spinner("Reconciling permissions...");
    let store = souq_db::open(&config.database.url, &config.database.store_options())
        .await
        .with_context(|| format!("Failed to open {}", souq_db::redact(&config.database.url)))?;
    let report = PermissionReconciler::new(ROUTES).sync(store.as_ref()).await;
    spinner.finish_and_clear();
    let report = report.context("Permission reconciliation failed")?;

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.success(&format!(
        "{} permissions required, {} inserted, {} granted to the super admin role",
        report.required,
        report.inserted.len(),
        report.granted
    ));
    for name in &report.inserted {
        ctx.output.list_item(name);
    }
    Ok(())
}

fn required(ctx: &Context) -> Result<()> {
    let required = PermissionReconciler::new(ROUTES).required();

    if ctx.output.is_json() {
        ctx.output.json(&required);
        return Ok(());
    }

    ctx.output.header(&format!("{} permissions", required.len()));
    ctx.output.table_row(&["NAME", "DESCRIPTION"], &[28, 40]);
    for permission in &required {
        ctx.output.table_row(&[permission.name.as_str(), permission.description.as_str()], &[28, 40]);
    }
    Ok(())
}
