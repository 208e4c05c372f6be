use thiserror::Error;

use crate::domain::product::ProductId;

/// Why a budget could not be accepted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BudgetIssue {
    #[error("budget `{raw}` is not a non-negative whole amount")]
    Unparsable { raw: String },
    #[error("budget {budget} is below the minimum of {floor}")]
    BelowFloor { budget: u64, floor: u64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed requirements: {0}")]
    MalformedRequirements(String),
    #[error("invalid budget: {0}")]
    InvalidBudget(#[from] BudgetIssue),
    #[error("malformed catalog entry `{}`: {reason}", .product_id.0)]
    MalformedCatalogEntry { product_id: ProductId, reason: String },
}

impl DomainError {
    /// Below-floor budgets are a domain answer ("nothing in that range"),
    /// not a fault.
    pub fn is_budget_below_floor(&self) -> bool {
        matches!(self, Self::InvalidBudget(BudgetIssue::BelowFloor { .. }))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("catalog failure: {0}")]
    Catalog(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("no products in range: {message}")]
    OutOfRange { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "I could not read all of your requirements. Could you restate them?"
            }
            Self::OutOfRange { .. } => {
                "There are no laptops in that price range. Please consider a higher budget."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::OutOfRange { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::OutOfRange { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::InvalidBudget(BudgetIssue::BelowFloor {
                budget,
                floor,
            })) => Self::OutOfRange {
                message: format!("budget {budget} is below {floor}"),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(DomainError::MalformedRequirements(_))
            | ApplicationError::Domain(DomainError::InvalidBudget(_))
            | ApplicationError::Domain(DomainError::MalformedCatalogEntry { .. }) => {
                Self::BadRequest {
                    message: "requirements validation failed".to_owned(),
                    correlation_id: "unassigned".to_owned(),
                }
            }
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Catalog(message) | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
