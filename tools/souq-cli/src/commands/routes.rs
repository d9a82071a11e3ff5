//! Print the route table.

use anyhow::Result;

use souq_auth::{Access, RouteSpec};
use souq_server::ROUTES;

use super::RoutesArgs;
use crate::context::Context;
use crate::output::access_badge;

pub async fn run(args: RoutesArgs, ctx: &Context) -> Result<()> {
    let routes = select(ROUTES, args.filter.as_deref());

    if ctx.output.is_json() {
        ctx.output.json(&routes);
        return Ok(());
    }

    ctx.output.header(&format!("{} routes", routes.len()));
    ctx.output.table_row(&["METHOD", "PATH", "ACCESS"], &[7, 58, 20]);
    for route in &routes {
        let access = access_badge(access_label(&route.access));
        ctx.output
            .table_row(&[route.method.as_str(), route.path, access.as_str()], &[7, 58, 20]);
    }
    Ok(())
}

fn select<'a>(routes: &'a [RouteSpec], filter: Option<&str>) -> Vec<&'a RouteSpec> {
    routes
        .iter()
        .filter(|r| filter.map_or(true, |f| r.path.contains(f)))
        .collect()
}

fn access_label(access: &Access) -> &'static str {
    match access {
        Access::Public => "public",
        Access::Storefront => "storefront",
        Access::Permission(name) => *name,
    }
}
