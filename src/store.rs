use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::envelope::{paginate, Page};
use crate::errors::ApiFailure;
use crate::models::{NewOrganization, Organization};

/// In-memory organization store, ordered by creation
#[derive(Debug, Default)]
pub struct OrganizationStore {
    organizations: RwLock<Vec<Organization>>,
}

impl OrganizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self, page: u64, per_page: u64) -> Page<Organization> {
        let organizations = self.organizations.read().await;
        paginate(&organizations, page, per_page)
    }

    pub async fn get(&self, id: Uuid) -> Option<Organization> {
        self.organizations
            .read()
            .await
            .iter()
            .find(|org| org.id == id)
            .cloned()
    }

    /// Insert a validated organization. Names are unique, ignoring case.
    pub async fn create(&self, new: NewOrganization) -> Result<Organization, ApiFailure> {
        let mut organizations = self.organizations.write().await;

        if organizations
            .iter()
            .any(|org| org.name.eq_ignore_ascii_case(&new.name))
        {
            return Err(ApiFailure::http_with_message(
                409,
                format!("An organization named '{}' already exists", new.name),
            ));
        }

        let organization = Organization {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            plan: new.plan,
            created_at: Utc::now(),
        };
        organizations.push(organization.clone());
        info!(id = %organization.id, name = %organization.name, "Organization created");

        Ok(organization)
    }

    /// Remove an organization, returning it if it existed
    pub async fn delete(&self, id: Uuid) -> Option<Organization> {
        let mut organizations = self.organizations.write().await;
        let index = organizations.iter().position(|org| org.id == id)?;
        Some(organizations.remove(index))
    }

    pub async fn len(&self) -> usize {
        self.organizations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
