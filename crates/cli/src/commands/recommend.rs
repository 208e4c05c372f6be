use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use shopassist_agent::{
    DeterministicRequirementExtractor, LlmRequirementExtractor, OpenAiCompatibleClient,
    RecommendationSession, RequirementExtractor, RetryPolicy, RetryingClient, SessionOutcome,
};
use shopassist_core::config::{AppConfig, ConfigOverrides};
use shopassist_core::{
    ApplicationError, CatalogSnapshot, CatalogStore, DomainError, InterfaceError,
};
use tracing::info;

use super::{
    current_thread_runtime, load_config, matching_catalog_path, CommandResult, EXIT_CATALOG,
    EXIT_COLLABORATOR, EXIT_CONFIG, EXIT_REQUIREMENTS,
};

const COMMAND: &str = "recommend";

#[derive(Debug, Clone, Default)]
pub struct RecommendArgs {
    /// File holding the assistant's requirements turn, or `-` for stdin.
    pub requirements: String,
    pub catalog: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub json: bool,
    /// Print the opening messages for the conversational layer instead.
    pub seed: bool,
    pub use_llm: bool,
}

/// What a resolved turn prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Envelope,
    Accepted,
    Seed,
}

impl OutputMode {
    fn from_args(args: &RecommendArgs) -> Self {
        if args.seed {
            Self::Seed
        } else if args.json {
            Self::Accepted
        } else {
            Self::Envelope
        }
    }
}

pub fn run(args: RecommendArgs) -> CommandResult {
    let overrides = ConfigOverrides { catalog_path: args.catalog.clone(), ..Default::default() };
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

    let turn = match read_requirements(&args.requirements) {
        Ok(turn) => turn,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "requirements_read",
                format!("{error:#}"),
                EXIT_REQUIREMENTS,
            )
        }
    };

    let catalog_path = if args.catalog.is_some() {
        config.catalog.path.clone()
    } else {
        matching_catalog_path(&config)
    };
    let snapshot = match CatalogSnapshot::load(&catalog_path) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            return CommandResult::failure(COMMAND, "catalog_load", error.to_string(), EXIT_CATALOG)
        }
    };
    let store = Arc::new(CatalogStore::new(snapshot));

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

    let mode = OutputMode::from_args(&args);
    if args.use_llm {
        let client = match OpenAiCompatibleClient::from_config(&config.llm) {
            Ok(client) => client,
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
        let session = build_session(LlmRequirementExtractor::new(client), store, &config);
        runtime.block_on(resolve(&session, &turn, mode))
    } else {
        let session = build_session(DeterministicRequirementExtractor, store, &config);
        runtime.block_on(resolve(&session, &turn, mode))
    }
}

fn build_session<E: RequirementExtractor>(
    extractor: E,
    store: Arc<CatalogStore>,
    config: &AppConfig,
) -> RecommendationSession<E> {
    RecommendationSession::new(
        extractor,
        store,
        config.matching.recommender(),
        config.matching.requirement_policy(),
    )
}

async fn resolve<E: RequirementExtractor>(
    session: &RecommendationSession<E>,
    turn: &str,
    mode: OutputMode,
) -> CommandResult {
    let correlation_id = session.correlation_id();
    let outcome = match session.handle_assistant_turn(turn).await {
        Ok(outcome) => outcome,
        Err(error) => return failure_for(error, &correlation_id),
    };

    info!(
        event_name = "cli.recommend.completed",
        correlation_id = %correlation_id,
        accepted = outcome.accepted().len(),
        "recommend command completed"
    );

    match outcome {
        SessionOutcome::NeedsMoreInformation => CommandResult::traced_failure(
            COMMAND,
            "requirements_incomplete",
            "the input holds no requirements dictionary yet; keep the conversation going",
            EXIT_REQUIREMENTS,
            &correlation_id,
        ),
        outcome @ SessionOutcome::BudgetBelowFloor { .. } => {
            CommandResult::success(COMMAND, outcome.reply().unwrap_or_default())
        }
        outcome if mode == OutputMode::Seed => match outcome.presentation_seed() {
            Ok(Some(messages)) => render_raw(&messages),
            Ok(None) => CommandResult::success(COMMAND, outcome.reply().unwrap_or_default()),
            Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 1),
        },
        outcome if mode == OutputMode::Accepted => render_raw(outcome.accepted()),
        outcome => CommandResult::success(COMMAND, outcome.reply().unwrap_or_default()),
    }
}

fn render_raw<T: serde::Serialize + ?Sized>(value: &T) -> CommandResult {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => CommandResult::raw(rendered),
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 1),
    }
}

fn failure_for(error: ApplicationError, correlation_id: &str) -> CommandResult {
    let error_class = match &error {
        ApplicationError::Domain(DomainError::InvalidBudget(_)) => "invalid_budget",
        ApplicationError::Domain(_) => "malformed_requirements",
        ApplicationError::Integration(_) => "collaborator_unavailable",
        ApplicationError::Catalog(_) => "catalog_load",
        ApplicationError::Configuration(_) => "config_validation",
    };
    let detail = error.to_string();
    let mapped = error.into_interface(correlation_id);
    let exit_code = match mapped {
        InterfaceError::BadRequest { .. } | InterfaceError::OutOfRange { .. } => EXIT_REQUIREMENTS,
        InterfaceError::ServiceUnavailable { .. } => EXIT_COLLABORATOR,
        InterfaceError::Internal { .. } => 1,
    };

    CommandResult::traced_failure(
        COMMAND,
        error_class,
        format!("{} ({detail})", mapped.user_message()),
        exit_code,
        mapped.correlation_id(),
    )
}

fn read_requirements(source: &str) -> Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read requirements from stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(source)
        .with_context(|| format!("failed to read requirements file `{source}`"))
}
