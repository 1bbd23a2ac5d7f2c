mod commands;
mod config;
mod duration;
mod logging;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use crate::commands::App;
use crate::config::{AppConfig, CliOverrides};

/// Academy CLI - tenant-aware client for the academy API
#[derive(Parser)]
#[command(name = "academy-cli")]
#[command(about = "Academy CLI - tenant-aware client for the academy API")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend origin override, e.g. https://api.hakwonplus.com
    #[arg(long)]
    base_url: Option<String>,

    /// Hostname to resolve the tenant from
    #[arg(long)]
    host: Option<String>,

    /// Directory holding the session file
    #[arg(long)]
    home_dir: Option<String>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or override the tenant
    Tenant {
        #[command(subcommand)]
        action: TenantCommand,
    },
    /// Sign in and store the token pair
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored tokens
    Logout,
    /// Show the signed-in user
    Me,
    /// GET an API path and print the response
    Get {
        /// Path relative to the API root, e.g. /students/
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long)]
        query: Vec<String>,
    },
    /// Student video playback
    Playback {
        #[command(subcommand)]
        action: PlaybackCommand,
    },
    /// Validate configuration and exit
    Check,
}

#[derive(Subcommand)]
enum TenantCommand {
    /// Show which tenant requests would be sent for
    Resolve {
        #[arg(long)]
        host: Option<String>,
    },
    /// Pin a tenant code, overriding hostname resolution
    Set { code: String },
    /// Remove the pinned tenant code
    Clear,
    /// List built-in tenants
    List,
}

#[derive(Subcommand)]
enum PlaybackCommand {
    /// Show playback details and the effective policy
    Info {
        video_id: u64,
        #[arg(long)]
        enrollment: Option<u64>,
    },
    /// Keep a monitored session open, then save progress
    Watch {
        video_id: u64,
        #[arg(long)]
        enrollment: Option<u64>,
        /// Playback session token
        #[arg(long)]
        token: String,
        /// How long to watch, e.g. 90s
        #[arg(long = "for", value_parser = humantime::parse_duration, default_value = "60s")]
        length: Duration,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) defaults -> 2) YAML (if provided) -> 3) env (ACADEMY__*) -> 4) CLI flags
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(CliOverrides {
        base_url: cli.base_url,
        host: cli.host,
        home_dir: cli.home_dir,
    });

    logging::init(cli.verbose, &config.logging);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Check => commands::check(&config),
        Commands::Tenant {
            action: TenantCommand::List,
        } => {
            commands::tenant_list();
            Ok(())
        }
        command => run(&App::new(config)?, command).await,
    }
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Tenant { action } => match action {
            TenantCommand::Resolve { host } => commands::tenant_resolve(app, host.as_deref()),
            TenantCommand::Set { code } => commands::tenant_set(app, &code),
            TenantCommand::Clear => {
                commands::tenant_clear(app);
                Ok(())
            }
            TenantCommand::List => {
                commands::tenant_list();
                Ok(())
            }
        },
        Commands::Login { username, password } => {
            commands::login(app, &username, password).await
        }
        Commands::Logout => {
            commands::logout(app);
            Ok(())
        }
        Commands::Me => commands::me(app).await,
        Commands::Get { path, query } => commands::get(app, &path, &query).await,
        Commands::Playback { action } => match action {
            PlaybackCommand::Info {
                video_id,
                enrollment,
            } => commands::playback_info(app, video_id, enrollment).await,
            PlaybackCommand::Watch {
                video_id,
                enrollment,
                token,
                length,
            } => commands::playback_watch(app, video_id, enrollment, token, length).await,
        },
        Commands::Check => commands::check(&app.config),
    }
}
