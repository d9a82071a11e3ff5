//! Souq CLI - operate the storefront API.
//!
//! Commands:
//! - `souq serve` - Boot the HTTP server
//! - `souq permissions` - Reconcile or list route permissions
//! - `souq routes` - Print the route table
//! - `souq token` - Issue a development access token
//! - `souq seed` - Insert reference data
//! - `souq config` - Inspect configuration

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ConfigArgs, PermissionsArgs, RoutesArgs, SeedArgs, ServeArgs, TokenArgs};

/// Souq CLI - run and administer the storefront API
#[derive(Parser)]
#[command(name = "souq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the HTTP server
    Serve(ServeArgs),

    /// Reconcile or list the permissions the routes require
    Permissions(PermissionsArgs),

    /// Print the route table
    Routes(RoutesArgs),

    /// Issue an admin access token for development
    Token(TokenArgs),

    /// Insert reference data into the configured store
    Seed(SeedArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);
    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &ctx).await,
        Commands::Permissions(args) => commands::permissions::run(args, &ctx).await,
        Commands::Routes(args) => commands::routes::run(args, &ctx).await,
        Commands::Token(args) => commands::token::run(args, &ctx).await,
        Commands::Seed(args) => commands::seed::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_token_flags() {
        let cli = Cli::try_parse_from(["souq", "--json", "token", "--admin-id", "1", "--role-id", "2"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Token(args) => {
                assert_eq!(args.admin_id, 1);
                assert_eq!(args.role_id, Some(2));
                assert_eq!(args.ttl_secs, souq_auth::DEFAULT_ACCESS_TTL_SECS);
            }
            _ => panic!("expected token command"),
        }
    }
}
