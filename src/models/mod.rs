pub mod organization;

pub use organization::{CreateOrganization, NewOrganization, Organization};
