// src/main.rs

pub mod app;
pub mod browse;
pub mod config;
pub mod customer;
pub mod derive;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod navigator;
pub mod page;
pub mod render;
pub mod route;
pub mod session;
pub mod tui;

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
//
use crate::{app::{App, ViewArgs}, config::Config};

#[derive(Parser)]
#[command(name = "practice-summary")]
#[command(about = "Weekly practice performance summaries for account managers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug, Default)]
struct ViewFlags {
    /// Column to sort by (e.g. name, tam, isTop12Focus, highSx, orders)
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending instead of ascending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Only show rows whose name or TAM contains this text
    #[arg(long)]
    search: Option<String>,
}

impl From<ViewFlags> for ViewArgs {
    fn from(flags: ViewFlags) -> Self {
        Self {
            sort: flags.sort,
            descending: flags.desc,
            search: flags.search,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render any page by path, e.g. /all or /dashboard/<id>
    Open {
        path: String,

        #[command(flatten)]
        view: ViewFlags,
    },

    /// Prescriber summary for one practice
    Dashboard {
        practice_id: String,

        /// Use the public report layout (no sign-in needed)
        #[arg(long)]
        public: bool,

        #[command(flatten)]
        view: ViewFlags,
    },

    /// All customers with their TAM and focus status
    Customers {
        #[command(flatten)]
        view: ViewFlags,
    },

    /// Text the customer's TAM a link to the practice report
    Sms { customer_id: String },

    /// Full-screen navigator; type commands at the prompt (help lists them)
    Browse {
        #[arg(default_value = "/all-customers")]
        path: String,

        /// Write logs here while the screen is taken over
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

/// Logs go to stderr, except in the full-screen browser where they would
/// tear the display: there they go to `log_file` or nowhere.
fn init_logging(log_file: Option<&Path>, interactive: bool) -> io::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("practice_summary_rusty=info")),
    );

    match (log_file, interactive) {
        (Some(path), _) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .init(),
        (None, true) => builder.with_writer(io::sink).init(),
        (None, false) => builder.with_writer(io::stderr).init(),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Browse { log_file, .. } => init_logging(log_file.as_deref(), true)?,
        _ => init_logging(None, false)?,
    }

    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "cannot start without configuration");
        e
    })?;

    tracing::info!(signed_in = config.session.signed_in, "practice-summary v{}", env!("CARGO_PKG_VERSION"));

    let app = Arc::new(App::new(config)?);

    let result = match cli.command {
        Commands::Open { path, view } => print_page(&app, &path, view).await,
        Commands::Dashboard { practice_id, public, view } => {
            let path = if public {
                format!("/public/dashboard/{}", practice_id)
            } else {
                format!("/dashboard/{}", practice_id)
            };
            print_page(&app, &path, view).await
        }
        Commands::Customers { view } => print_page(&app, "/all", view).await,
        Commands::Sms { customer_id } => match app.send_report_by_id(&customer_id).await {
            Ok(message) => {
                println!("{}", message);
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        Commands::Browse { path, .. } => browse::run(app.clone(), &path).await,
    };

    app.shutdown().await;

    result
}

async fn print_page(app: &App, path: &str, view: ViewFlags) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let screen = app.show(path, &view.into()).await?;
    println!("{}", screen);

    Ok(())
}
