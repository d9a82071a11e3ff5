//! CLI command implementations.

pub mod config;
pub mod permissions;
pub mod routes;
pub mod seed;
pub mod serve;
pub mod token;

use clap::{Args, Subcommand};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind, overriding the config file.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Database URL, overriding the config file.
    #[arg(long)]
    pub database_url: Option<String>,
}

/// Arguments for the permissions command.
#[derive(Args)]
pub struct PermissionsArgs {
    #[command(subcommand)]
    pub command: PermissionsCommand,
}

#[derive(Subcommand)]
pub enum PermissionsCommand {
    /// Insert missing permissions and grant them to the super admin role
    Sync,
    /// List the permissions the route table requires
    Required,
}

/// Arguments for the routes command.
#[derive(Args)]
pub struct RoutesArgs {
    /// Only show routes whose path contains this text.
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the token command.
#[derive(Args)]
pub struct TokenArgs {
    /// Admin id to embed.
    #[arg(long)]
    pub admin_id: i64,

    /// Role id to embed. Omit for a roleless token.
    #[arg(long)]
    pub role_id: Option<i64>,

    /// Lifetime in seconds.
    #[arg(long, default_value_t = souq_auth::DEFAULT_ACCESS_TTL_SECS)]
    pub ttl_secs: i64,
}

/// Arguments for the seed command.
#[derive(Args)]
pub struct SeedArgs {
    /// Also create these storefronts, as `name:slug:domain`.
    #[arg(long = "store-front")]
    pub store_fronts: Vec<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration with secrets masked
    Show,
    /// Print the config file in use
    Path,
}
