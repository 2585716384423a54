use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{ApiFailure, FieldErrors};

pub const PLANS: [&str; 3] = ["free", "pro", "enterprise"];

const MAX_NAME_LENGTH: usize = 255;

/// A tenant organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Subscription plan: free, pro or enterprise
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/organizations`.
///
/// Every field is optional at the serde level so that missing fields are
/// reported as field errors rather than a body parse failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateOrganization {
    pub name: Option<String>,
    pub email: Option<String>,
    pub plan: Option<String>,
}

/// A create request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrganization {
    pub name: String,
    pub email: String,
    pub plan: String,
}

impl CreateOrganization {
    pub fn validate(self) -> Result<NewOrganization, ApiFailure> {
        let mut errors = FieldErrors::new();

        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            push(&mut errors, "name", "The name field is required.");
        } else if name.chars().count() > MAX_NAME_LENGTH {
            push(
                &mut errors,
                "name",
                format!("The name may not be greater than {MAX_NAME_LENGTH} characters."),
            );
        }

        let email = self.email.map(|e| e.trim().to_lowercase()).unwrap_or_default();
        if email.is_empty() {
            push(&mut errors, "email", "The email field is required.");
        } else if !is_email(&email) {
            push(&mut errors, "email", "The email must be a valid email address.");
        }

        let plan = self.plan.unwrap_or_else(|| "free".to_string());
        if !PLANS.contains(&plan.as_str()) {
            push(&mut errors, "plan", "The selected plan is invalid.");
        }

        if !errors.is_empty() {
            return Err(ApiFailure::validation(errors));
        }

        Ok(NewOrganization { name, email, plan })
    }
}

fn push(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.contains(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
