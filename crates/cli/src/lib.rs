pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shopassist_core::config::{AppConfig, ConfigOverrides};

use commands::prepare::PrepareArgs;
use commands::recommend::RecommendArgs;

#[derive(Debug, Parser)]
#[command(
    name = "shopassist",
    about = "ShopAssist laptop recommender CLI",
    long_about = "Match laptop requirements against a catalog, prepare catalog feature \
                  records, and inspect configuration.",
    after_help = "Examples:\n  shopassist recommend --requirements turn.txt\n  \
                  shopassist prepare --catalog data/laptops.json\n  shopassist doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a shopassist.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recommend laptops for a requirements dictionary")]
    Recommend {
        #[arg(long, help = "File with the assistant's requirements turn, or `-` for stdin")]
        requirements: String,
        #[arg(long, help = "Catalog file to match against")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Print the accepted products as a JSON array")]
        json: bool,
        #[arg(
            long,
            conflicts_with = "json",
            help = "Print the chat messages that hand the accepted products to a conversation"
        )]
        seed: bool,
        #[arg(long, help = "Ask the language model to restate requirements it cannot parse")]
        use_llm: bool,
    },
    #[command(about = "Fill missing catalog feature records and write a prepared catalog")]
    Prepare {
        #[arg(long, help = "Raw catalog file")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Where to write the prepared catalog")]
        output: Option<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, catalog readability and feature coverage")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let config_path = cli.config;
    let result = match cli.command {
        Command::Recommend { requirements, catalog, json, seed, use_llm } => {
            commands::recommend::run(RecommendArgs {
                requirements,
                catalog,
                config_path,
                json,
                seed,
                use_llm,
            })
        }
        Command::Prepare { catalog, output } => {
            commands::prepare::run(PrepareArgs { catalog, output, config_path })
        }
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(config_path.as_deref()),
        },
        Command::Doctor { json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(json, config_path.as_deref()),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging(cli: &Cli) {
    let config = AppConfig::load(shopassist_core::config::LoadOptions {
        config_path: cli.config.clone(),
        require_file: false,
        overrides: ConfigOverrides::default(),
    })
    .unwrap_or_default();
    logging::init(&config);
}
