use std::path::PathBuf;

use shopassist_agent::{
    CatalogPreparer, LlmFeatureExtractor, OpenAiCompatibleClient, RetryPolicy, RetryingClient,
};
use shopassist_core::config::ConfigOverrides;
use shopassist_core::CatalogSnapshot;

use super::{
    current_thread_runtime, load_config, CommandResult, EXIT_CATALOG, EXIT_COLLABORATOR,
    EXIT_CONFIG,
};

const COMMAND: &str = "prepare";

#[derive(Debug, Clone, Default)]
pub struct PrepareArgs {
    pub catalog: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

pub fn run(args: PrepareArgs) -> CommandResult {
    let overrides = ConfigOverrides {
        catalog_path: args.catalog,
        prepared_catalog_path: args.output,
        ..Default::default()
    };
    let config = match load_config(args.config_path.as_deref(), overrides) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let snapshot = match CatalogSnapshot::load(&config.catalog.path) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            return CommandResult::failure(COMMAND, "catalog_load", error.to_string(), EXIT_CATALOG)
        }
    };

    let client = match OpenAiCompatibleClient::from_config(&config.llm) {
        Ok(client) => client.with_seed(1234),
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "collaborator_setup",
                format!("{error:#}"),
                EXIT_COLLABORATOR,
            )
        }
    };
    let client = RetryingClient::new(client, RetryPolicy::from_config(&config.llm));
    let mut preparer = CatalogPreparer::new(LlmFeatureExtractor::new(client));

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };
    let (prepared, report) = runtime.block_on(preparer.prepare(snapshot));

    if let Err(error) = prepared.save(&config.catalog.prepared_path) {
        return CommandResult::failure(COMMAND, "catalog_write", error.to_string(), EXIT_CATALOG);
    }

    CommandResult::success(
        COMMAND,
        format!(
            "prepared {} products into `{}`: {} already prepared, {} extracted, {} from cache, {} still without features",
            report.total,
            config.catalog.prepared_path.display(),
            report.already_prepared,
            report.extracted,
            report.cache_hits,
            report.unprepared()
        ),
    )
}
