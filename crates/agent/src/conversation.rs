use std::sync::Arc;

use serde::Serialize;
use shopassist_core::canonical::fragment;
use shopassist_core::domain::attribute::{Attribute, BUDGET_KEY};
use shopassist_core::{
    ApplicationError, BudgetIssue, CatalogStore, DomainError, Recommender, RequirementPolicy,
    Requirements, ScoredCandidate,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extraction::{ExtractionError, RequirementExtractor};
use crate::llm::ChatMessage;
use crate::presentation::{below_floor_reply, render_summary, seed_messages, NO_MATCH_REPLY};

/// What one assistant turn resolved to.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The turn does not yet hold a requirements dictionary; keep talking.
    NeedsMoreInformation,
    BudgetBelowFloor { budget: u64, floor: u64 },
    NoMatch { requirements: Requirements },
    Recommendations { requirements: Requirements, accepted: Vec<ScoredCandidate> },
}

impl SessionOutcome {
    /// The fixed reply for terminal outcomes that need no model.
    pub fn reply(&self) -> Option<String> {
        match self {
            Self::NeedsMoreInformation => None,
            Self::BudgetBelowFloor { floor, .. } => Some(below_floor_reply(*floor)),
            Self::NoMatch { .. } => Some(NO_MATCH_REPLY.to_string()),
            Self::Recommendations { accepted, .. } => Some(render_summary(accepted)),
        }
    }

    pub fn accepted(&self) -> &[ScoredCandidate] {
        match self {
            Self::Recommendations { accepted, .. } => accepted,
            _ => &[],
        }
    }

    /// Opening messages for the conversational layer. Only a non-empty
    /// accepted set is handed over; other outcomes answer with [`Self::reply`].
    pub fn presentation_seed(&self) -> Result<Option<Vec<ChatMessage>>, serde_json::Error> {
        match self {
            Self::Recommendations { accepted, .. } => seed_messages(accepted).map(Some),
            _ => Ok(None),
        }
    }
}

/// Whether an assistant turn already names all six requirement keys, either
/// inside a `{ ... }` fragment or as a loose list.
pub fn intent_confirmed(assistant_turn: &str) -> bool {
    let keys = requirement_keys();
    fragment::scan(assistant_turn, &keys).len() == keys.len()
}

fn requirement_keys() -> Vec<&'static str> {
    Attribute::ALL.iter().map(|attribute| attribute.key()).chain([BUDGET_KEY]).collect()
}

/// Glue between the dialogue and the deterministic core for one user.
pub struct RecommendationSession<E> {
    id: Uuid,
    extractor: E,
    catalog: Arc<CatalogStore>,
    recommender: Recommender,
    policy: RequirementPolicy,
}

impl<E> RecommendationSession<E>
where
    E: RequirementExtractor,
{
    pub fn new(
        extractor: E,
        catalog: Arc<CatalogStore>,
        recommender: Recommender,
        policy: RequirementPolicy,
    ) -> Self {
        Self { id: Uuid::new_v4(), extractor, catalog, recommender, policy }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn correlation_id(&self) -> String {
        self.id.to_string()
    }

    /// Resolves an assistant turn. Malformed requirements come back as
    /// [`ApplicationError::Domain`] so the dialogue can re-prompt; a budget
    /// below the floor is an outcome, not an error.
    pub async fn handle_assistant_turn(
        &self,
        assistant_turn: &str,
    ) -> Result<SessionOutcome, ApplicationError> {
        if !intent_confirmed(assistant_turn) {
            debug!(
                event_name = "agent.session.intent_pending",
                session_id = %self.id,
                "assistant turn holds no requirements yet"
            );
            return Ok(SessionOutcome::NeedsMoreInformation);
        }

        match self.extractor.extract(assistant_turn, &self.policy).await {
            Ok(requirements) => Ok(self.recommend_for(requirements)),
            Err(ExtractionError::Domain(DomainError::InvalidBudget(BudgetIssue::BelowFloor {
                budget,
                floor,
            }))) => {
                info!(
                    event_name = "agent.session.budget_below_floor",
                    session_id = %self.id,
                    budget,
                    floor,
                    "budget is below the catalog floor"
                );
                Ok(SessionOutcome::BudgetBelowFloor { budget, floor })
            }
            Err(error) => {
                warn!(
                    event_name = "agent.session.extraction_failed",
                    session_id = %self.id,
                    error = %error,
                    "could not extract requirements"
                );
                Err(error.into())
            }
        }
    }

    /// Matches already canonical requirements against the current snapshot.
    pub fn recommend_for(&self, requirements: Requirements) -> SessionOutcome {
        let snapshot = self.catalog.snapshot();
        let accepted = self.recommender.recommend(&requirements, &snapshot.products);

        info!(
            event_name = "agent.session.recommended",
            session_id = %self.id,
            catalog_size = snapshot.len(),
            accepted = accepted.len(),
            "recommendation computed"
        );

        if accepted.is_empty() {
            SessionOutcome::NoMatch { requirements }
        } else {
            SessionOutcome::Recommendations { requirements, accepted }
        }
    }
}
