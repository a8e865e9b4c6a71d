use anyhow::Result;
use clap::{Parser, Subcommand};

use horizon::cli::{self, OutputFormat, Session};
use horizon::config;

#[derive(Debug, Parser)]
#[command(name = "horizon")]
#[command(about = "AI Horizon Scanner: compare AI development, investment and public opinion data")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the dashboard overview: sections, weekly spotlight, dataset availability
    Overview {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show the KPI panel of one dashboard section
    Kpis {
        /// Section: development, geographic, innovation, investment, public-view
        section: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Compare a metric across groups of one dimension
    Compare {
        /// Dimension: domain, org-type, country
        #[arg(long)]
        dimension: String,
        /// Metric: training-cost, parameters, compute, system-count, patents
        #[arg(long)]
        metric: String,
        /// First year of the range (default: comparison.default_start_year)
        #[arg(long)]
        from: Option<i32>,
        /// Last year of the range (default: latest year in the data)
        #[arg(long)]
        to: Option<i32>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Rank years by how concentrated private AI investment is across regions
    Concentration {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Rank investment focus areas by year-over-year volatility
    Volatility {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// List the dataset catalog and whether each file loads
    Datasets {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Launch the web dashboard
    Web {
        /// Listen address (default: web.addr from config)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser window
        #[arg(long)]
        no_browser: bool,
    },
    /// Summarize the activity log
    Activity {
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check data directory, datasets, config and activity log
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective merged configuration
    Show,
    /// Write a default config file to ~/.horizon/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one value, e.g. `horizon config set data.dir ~/ai-data`
    Set { key: String, value: String },
    /// Reset the config file to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let fmt = |s: &str| OutputFormat::from_str_opt(Some(s));

    match app.command {
        Commands::Overview { format } => {
            let mut session = Session::new(config::load());
            let today = chrono::Local::now().date_naive();
            cli::run_overview(&mut session, today, fmt(&format))
        }
        Commands::Kpis { section, format } => {
            let mut session = Session::new(config::load());
            cli::run_kpis(&mut session, &section, fmt(&format))
        }
        Commands::Compare {
            dimension,
            metric,
            from,
            to,
            format,
        } => {
            let mut session = Session::new(config::load());
            cli::run_compare(&mut session, &dimension, &metric, from, to, fmt(&format))
        }
        Commands::Concentration { format } => {
            let mut session = Session::new(config::load());
            cli::run_concentration(&mut session, fmt(&format))
        }
        Commands::Volatility { format } => {
            let mut session = Session::new(config::load());
            cli::run_volatility(&mut session, fmt(&format))
        }
        Commands::Datasets { format } => {
            let mut session = Session::new(config::load());
            cli::run_datasets(&mut session, fmt(&format))
        }
        Commands::Web { addr, no_browser } => {
            let config = config::load();
            let addr = addr.unwrap_or_else(|| config.web.addr.clone());
            let open = config.web.open_browser && !no_browser;
            horizon::web::serve(config, &addr, open)
        }
        Commands::Activity { days, format } => {
            let session = Session::new(config::load());
            cli::run_activity(&session, days, fmt(&format))
        }
        Commands::Health => {
            let mut session = Session::new(config::load());
            cli::run_health(&mut session)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
