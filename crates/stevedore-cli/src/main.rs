//! Stevedore CLI - offline installers for Kubernetes applications

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod config;
mod context;
mod display;
mod error;
mod exit_codes;
mod util;

use config::StevedoreConfig;
use context::Context;
use error::Result;

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(author = "Stevedore Contributors")]
#[command(version)]
#[command(about = "Offline installers for Kubernetes applications", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Local package store
    #[arg(long, global = true, env = "STEVEDORE_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an application image from a Helm chart
    Build {
        /// Chart directory
        chart: PathBuf,

        /// Output file (default: <name>-<version>.tar)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing output file
        #[arg(long)]
        overwrite: bool,

        /// Previous application image; its embedded images are not vendored again
        #[arg(long)]
        from: Option<PathBuf>,

        /// Repository to register the application in
        #[arg(long)]
        repository: Option<String>,
    },

    /// Generate an offline installer for a stored application
    Installer {
        /// Application locator (repository/name:version)
        locator: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// PEM certificate of the cluster certificate authority
        #[arg(long)]
        ca_cert: Option<PathBuf>,

        /// Trusted cluster descriptor (YAML or JSON)
        #[arg(long)]
        trusted_cluster: Option<PathBuf>,

        /// Account created in the installer
        #[arg(long)]
        account: Option<String>,

        /// Passphrase sealing the installer's package content
        #[arg(long, env = "STEVEDORE_ENCRYPTION_KEY", hide_env_values = true)]
        encryption_key: Option<String>,

        /// Additional package to carry
        #[arg(long = "package")]
        packages: Vec<String>,

        /// Additional application to carry
        #[arg(long = "app")]
        apps: Vec<String>,
    },

    /// Manage raw packages
    Package {
        #[command(subcommand)]
        command: PackageCommands,
    },

    /// Manage application packages
    App {
        #[command(subcommand)]
        command: AppCommands,
    },

    /// Print the dependency closure of an application
    Deps {
        /// Application locator (repository/name:version)
        locator: String,

        /// Additional package to include
        #[arg(long = "package")]
        packages: Vec<String>,

        /// Additional application to include
        #[arg(long = "app")]
        apps: Vec<String>,
    },
}

#[derive(Subcommand)]
enum PackageCommands {
    /// Import a file as a package
    Import {
        /// Package locator (repository/name:version)
        locator: String,

        /// File holding the package content
        file: PathBuf,

        /// Runtime label (key=value)
        #[arg(long = "label")]
        labels: Vec<String>,
    },

    /// List packages in a repository
    List {
        /// Repository (default from config, else gravitational.io)
        repository: Option<String>,
    },
}

#[derive(Subcommand)]
enum AppCommands {
    /// Import an application package tarball
    Import {
        /// tar.gz holding resources/app.yaml
        tarball: PathBuf,
    },

    /// List applications in a repository
    List {
        /// Repository (default from config, else gravitational.io)
        repository: Option<String>,
    },
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = StevedoreConfig::load(cli.config.as_deref())?;
    let state_dir = config.state_dir(cli.state_dir.as_deref())?;
    let ctx = Context::new(config, state_dir);

    match cli.command {
        Commands::Build {
            chart,
            output,
            overwrite,
            from,
            repository,
        } => commands::build::run(
            &ctx,
            commands::build::BuildArgs {
                chart: &chart,
                output: output.as_deref(),
                overwrite,
                from: from.as_deref(),
                repository: repository.as_deref(),
            },
        ),

        Commands::Installer {
            locator,
            output,
            ca_cert,
            trusted_cluster,
            account,
            encryption_key,
            packages,
            apps,
        } => commands::installer::run(
            &ctx,
            commands::installer::InstallerArgs {
                locator: &locator,
                output: &output,
                ca_cert: ca_cert.as_deref(),
                trusted_cluster: trusted_cluster.as_deref(),
                account: account.as_deref(),
                encryption_key: encryption_key.as_deref(),
                packages: &packages,
                apps: &apps,
            },
        ),

        Commands::Package { command } => match command {
            PackageCommands::Import {
                locator,
                file,
                labels,
            } => commands::package::import(&ctx, &locator, &file, &labels),
            PackageCommands::List { repository } => {
                commands::package::list(&ctx, repository.as_deref())
            }
        },

        Commands::App { command } => match command {
            AppCommands::Import { tarball } => commands::app::import(&ctx, &tarball),
            AppCommands::List { repository } => commands::app::list(&ctx, repository.as_deref()),
        },

        Commands::Deps {
            locator,
            packages,
            apps,
        } => commands::deps::run(&ctx, &locator, &packages, &apps),
    }
}
