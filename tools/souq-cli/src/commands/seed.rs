//! Reference data seeding.

use anyhow::{bail, Context as _, Result};

use souq_db::{ensure_store_front, seed_reference_data};

use super::SeedArgs;
use crate::context::Context;

pub async fn run(args: SeedArgs, ctx: &Context) -> Result<()> {
    let store_fronts = args
        .store_fronts
        .iter()
        .map(|s| parse_store_front(s))
        .collect::<Result<Vec<_>>>()?;

    let config = ctx.config()?;
    if config.database.is_memory() {
        ctx.output.warn("database.url is in-memory; seeded rows are discarded on exit");
    }
    let store = souq_db::open(&config.database.url, &config.database.store_options())
        .await
        .with_context(|| format!("Failed to open {}", souq_db::redact(&config.database.url)))?;

    let report = seed_reference_data(store.as_ref())
        .await
        .context("Failed to seed reference data")?;
    ctx.output.success(&format!(
        "Seeded {} statuses, {} currencies, {} roles",
        report.statuses, report.currencies, report.roles
    ));

    let configured = config
        .store_fronts
        .iter()
        .map(|f| (f.name.as_str(), f.slug.as_str(), f.domain.as_str()));
    let requested = store_fronts.iter().map(|(n, s, d)| (*n, *s, *d));
    for (name, slug, domain) in configured.chain(requested) {
        let front = ensure_store_front(store.as_ref(), name, slug, domain)
            .await
            .with_context(|| format!("Failed to create store front {}", domain))?;
        ctx.output
            .info(&format!("Store front {} ({}) -> id {}", front.slug, front.domain, front.id));
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "statuses": report.statuses,
            "currencies": report.currencies,
            "roles": report.roles,
        }));
    }
    Ok(())
}

/// Parse `name:slug:domain`.
fn parse_store_front(value: &str) -> Result<(&str, &str, &str)> {
    let parts: Vec<&str> = value.split(':').map(str::trim).collect();
    match parts.as_slice() {
        [name, slug, domain] if !name.is_empty() && !slug.is_empty() && !domain.is_empty() => {
            Ok((*name, *slug, *domain))
        }
        _ => bail!("invalid --store-front {:?}, expected name:slug:domain", value),
    }
}
