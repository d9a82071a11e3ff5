//! Boot the HTTP server.

use anyhow::Result;

use super::ServeArgs;
use crate::context::Context;

pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config()?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if ctx.output.is_verbose() {
        config.log.level = "debug".to_string();
    }
    config.validate()?;

    souq_server::init_tracing(&config.log)?;
    ctx.output.debug(&format!("Binding {}", config.bind));
    souq_server::serve(config).await
}
