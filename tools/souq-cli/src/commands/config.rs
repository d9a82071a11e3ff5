//! Configuration inspection.

use anyhow::{Context as _, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        Some(ConfigCommand::Show) | None => show(ctx),
        Some(ConfigCommand::Path) => path(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let config = ctx.config()?.redacted();
    if ctx.output.is_json() {
        ctx.output.json(&config);
        return Ok(());
    }
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

fn path(ctx: &Context) -> Result<()> {
    match &ctx.config_path {
        Some(path) => println!("{}", path.display()),
        None => ctx.output.info("No config file found; using defaults and environment"),
    }
    Ok(())
}
