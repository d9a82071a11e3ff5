//! Development access tokens.

use anyhow::{bail, Context as _, Result};
use chrono::{Duration, Utc};
use serde::Serialize;

use souq_auth::TokenSigner;
use souq_commerce::{AdminId, RoleId};

use super::TokenArgs;
use crate::context::Context;

#[derive(Serialize)]
struct IssuedToken {
    token: String,
    admin_id: i64,
    role_id: Option<i64>,
    expires_at: String,
}

pub async fn run(args: TokenArgs, ctx: &Context) -> Result<()> {
    if args.ttl_secs <= 0 {
        bail!("--ttl-secs must be positive");
    }
    let config = ctx.config()?;
    let signer = TokenSigner::new(&config.auth.jwt_secret).context("Invalid auth.jwt_secret")?;
    let token = signer.issue_admin_access(
        AdminId::new(args.admin_id),
        args.role_id.map(RoleId::new),
        args.ttl_secs,
    )?;

    let issued = IssuedToken {
        token,
        admin_id: args.admin_id,
        role_id: args.role_id,
        expires_at: (Utc::now() + Duration::seconds(args.ttl_secs)).to_rfc3339(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&issued);
        return Ok(());
    }

    if args.role_id.is_none() {
        ctx.output
            .warn("token carries no role; every permission route will answer 403");
    }
    ctx.output.kv("admin_id", &issued.admin_id.to_string());
    ctx.output.kv("expires_at", &issued.expires_at);
    println!("{}", issued.token);
    Ok(())
}
