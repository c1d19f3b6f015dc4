use serde::{Deserialize, Serialize};

use super::Passthrough;

/// Sub-resources embedded in a person details response
pub const PERSON_APPENDED_RESOURCES: &[&str] = &["movie_credits", "images", "external_ids"];

/// Full person record including appended sub-resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDetails {
    pub id: u64,
    #[serde(flatten)]
    pub extra: Passthrough,
}

impl PersonDetails {
    /// Embedded sub-resource by name, e.g. `external_ids`
    pub fn appended(&self, resource: &str) -> Option<&serde_json::Value> {
        self.extra.get(resource)
    }
}
