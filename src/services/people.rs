use tracing::debug;

use crate::caching::CacheKey;
use crate::core::error::UpstreamError;
use crate::models::{PersonDetails, PERSON_APPENDED_RESOURCES};
use crate::upstream::UpstreamRequest;

use super::fetcher::CachedFetcher;

#[derive(Debug, Clone)]
pub struct PersonService {
    fetcher: CachedFetcher,
}

impl PersonService {
    pub fn new(fetcher: CachedFetcher) -> Self {
        Self { fetcher }
    }

    /// Person details with movie credits, images and external ids embedded
    pub async fn get_person(&self, id: u64) -> Result<PersonDetails, UpstreamError> {
        let request = UpstreamRequest::new(format!("person/{}", id))
            .append_to_response(PERSON_APPENDED_RESOURCES);

        let person: PersonDetails = self.fetcher.fetch(request, &CacheKey::person_details(id)).await?;

        let _guard = self.fetcher.logger().span().enter();
        debug!(person_id = id, "Person details resolved");
        Ok(person)
    }
}
