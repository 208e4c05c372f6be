use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use shopassist_agent::{
    ChatMessage, DeterministicRequirementExtractor, LlmClient, LlmRequirementExtractor,
    RecommendationSession, ResponseFormat, RetryPolicy, RetryingClient, SessionOutcome,
};
use shopassist_core::{
    ApplicationError, CatalogSnapshot, CatalogStore, DomainError, Recommender, RequirementPolicy,
};

const EDITOR_TURN: &str = "Thanks! Here is your profile: {'GPU intensity': 'high', \
    'Display quality': 'high', 'Portability': 'low', 'Multitasking': 'high', \
    'Processing speed': 'high', 'Budget': '150000'}";

fn store() -> Arc<CatalogStore> {
    let row = |name: &str, price: &str, level: &str| {
        json!({
            "Model Name": name,
            "Price": price,
            "laptop_feature": format!(
                "{{'GPU intensity': '{level}', 'Display quality': '{level}', \
                 'Portability': '{level}', 'Multitasking': '{level}', \
                 'Processing speed': '{level}'}}"
            )
        })
    };
    let rows = json!([
        row("Studio", "1,45,000", "high"),
        row("Office", "45,000", "low"),
        row("Allrounder", "85,000", "medium"),
        row("Flagship", "2,10,000", "high"),
    ]);
    let snapshot = CatalogSnapshot::from_json_str(&rows.to_string()).expect("fixture parses");
    Arc::new(CatalogStore::new(snapshot))
}

fn session<E: shopassist_agent::RequirementExtractor>(extractor: E) -> RecommendationSession<E> {
    RecommendationSession::new(
        extractor,
        store(),
        Recommender::default(),
        RequirementPolicy::default(),
    )
}

/// Fails a fixed number of times, then replies with a canonical dictionary.
struct FlakyDictionary {
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for FlakyDictionary {
    async fn complete(&self, _: &[ChatMessage], format: ResponseFormat) -> Result<String> {
        assert_eq!(format, ResponseFormat::Json);
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            anyhow::bail!("503 service unavailable");
        }
        Ok(json!({
            "GPU intensity": "medium",
            "Display quality": "medium",
            "Portability": "medium",
            "Multitasking": "medium",
            "Processing speed": "medium",
            "Budget": "90000"
        })
        .to_string())
    }
}

#[tokio::test]
async fn editor_profile_gets_recommendations_within_budget() {
    let session = session(DeterministicRequirementExtractor);
    let outcome = session.handle_assistant_turn(EDITOR_TURN).await.expect("turn resolves");

    let names: Vec<&str> =
        outcome.accepted().iter().map(|candidate| candidate.product.name.as_str()).collect();
    assert_eq!(names, vec!["Studio"]);
    assert_eq!(outcome.accepted()[0].score, 5);
    assert!(outcome.reply().is_some_and(|reply| reply.contains("Studio")));
}

#[tokio::test]
async fn clarifying_question_needs_more_information() {
    let session = session(DeterministicRequirementExtractor);
    let outcome = session
        .handle_assistant_turn("Do you travel often with your laptop?")
        .await
        .expect("turn resolves");
    assert_eq!(outcome, SessionOutcome::NeedsMoreInformation);
    assert_eq!(outcome.reply(), None);
}

#[tokio::test]
async fn low_budget_is_a_domain_outcome() {
    let session = session(DeterministicRequirementExtractor);
    let outcome = session
        .handle_assistant_turn(
            "{'GPU intensity': 'low', 'Display quality': 'low', 'Portability': 'high', \
             'Multitasking': 'low', 'Processing speed': 'low', 'Budget': '20,000 INR'}",
        )
        .await
        .expect("below floor is not an error");
    assert_eq!(outcome, SessionOutcome::BudgetBelowFloor { budget: 20_000, floor: 25_000 });
    assert!(outcome.reply().is_some_and(|reply| reply.contains("no laptops")));
}

#[tokio::test]
async fn nothing_above_threshold_is_no_match() {
    let session = session(DeterministicRequirementExtractor);
    let outcome = session
        .handle_assistant_turn(
            "{'GPU intensity': 'high', 'Display quality': 'high', 'Portability': 'high', \
             'Multitasking': 'high', 'Processing speed': 'high', 'Budget': '50000'}",
        )
        .await
        .expect("turn resolves");
    assert!(matches!(
        outcome,
        SessionOutcome::NoMatch { ref requirements } if requirements.budget == 50_000
    ));
}

#[tokio::test]
async fn partial_dictionary_needs_more_information() {
    let session = session(DeterministicRequirementExtractor);
    let outcome = session
        .handle_assistant_turn("So far: {'GPU intensity': 'high', 'Budget': '90000'}")
        .await
        .expect("turn resolves");
    assert_eq!(outcome, SessionOutcome::NeedsMoreInformation);
}

#[tokio::test]
async fn out_of_vocabulary_level_surfaces_malformed_requirements() {
    let session = session(DeterministicRequirementExtractor);
    let error = session
        .handle_assistant_turn(
            "{'GPU intensity': 'extreme', 'Display quality': 'high', 'Portability': 'low', \
             'Multitasking': 'high', 'Processing speed': 'high', 'Budget': '90000'}",
        )
        .await
        .expect_err("unknown level");
    assert!(matches!(error, ApplicationError::Domain(DomainError::MalformedRequirements(_))));
}

#[tokio::test]
async fn recommendations_seed_the_conversation() {
    let session = session(DeterministicRequirementExtractor);
    let outcome = session.handle_assistant_turn(EDITOR_TURN).await.expect("turn resolves");

    let seed = outcome.presentation_seed().expect("seed serializes").expect("accepted set");
    assert_eq!(seed.len(), 2);
    assert!(seed[1].content.contains("Studio"));
    assert!(!seed[1].content.contains("Flagship"));

    let pending = SessionOutcome::NeedsMoreInformation;
    assert_eq!(pending.presentation_seed().expect("nothing to serialize"), None);
}

#[tokio::test]
async fn model_fallback_recovers_through_retries() {
    let client = RetryingClient::new(
        FlakyDictionary { failures: 2, calls: AtomicUsize::new(0) },
        RetryPolicy::immediate(3),
    );
    let session = session(LlmRequirementExtractor::new(client));

    let outcome = session
        .handle_assistant_turn(
            "{'GPU intensity': 'mid', 'Display quality': 'mid', 'Portability': 'mid', \
             'Multitasking': 'mid', 'Processing speed': 'mid', 'Budget': 'about 90k'}",
        )
        .await
        .expect("fallback succeeds");

    let names: Vec<&str> =
        outcome.accepted().iter().map(|candidate| candidate.product.name.as_str()).collect();
    assert_eq!(names, vec!["Allrounder"]);
}

#[tokio::test]
async fn exhausted_retries_are_an_integration_failure() {
    let client = RetryingClient::new(
        FlakyDictionary { failures: 10, calls: AtomicUsize::new(0) },
        RetryPolicy::immediate(1),
    );
    let session = session(LlmRequirementExtractor::new(client));

    let error = session
        .handle_assistant_turn(
            "{'GPU intensity': 'whatever', 'Display quality': 'high', 'Portability': 'low', \
             'Multitasking': 'high', 'Processing speed': 'high', 'Budget': '90000'}",
        )
        .await
        .expect_err("collaborator never recovers");
    assert!(matches!(error, ApplicationError::Integration(_)));
}

#[tokio::test]
async fn reload_is_visible_to_the_next_turn_only() {
    let catalog = store();
    let session = RecommendationSession::new(
        DeterministicRequirementExtractor,
        Arc::clone(&catalog),
        Recommender::default(),
        RequirementPolicy::default(),
    );

    let before = catalog.snapshot();
    catalog.replace(CatalogSnapshot::default());

    assert_eq!(before.len(), 4);
    let outcome = session.handle_assistant_turn(EDITOR_TURN).await.expect("turn resolves");
    assert!(matches!(outcome, SessionOutcome::NoMatch { .. }));
}
