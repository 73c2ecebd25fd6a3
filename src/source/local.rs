use async_trait::async_trait;

use super::{DataSource, SourceError};
use crate::aggregate::RECENT_TICK_LIMIT;
use crate::db::{NewWebsite, Store, Website};

#[async_trait]
impl DataSource for Store {
    async fn list_websites(&self) -> Result<Vec<Website>, SourceError> {
        Ok(self.get_websites(RECENT_TICK_LIMIT)?)
    }

    async fn create_website(&self, website: &NewWebsite) -> Result<String, SourceError> {
        Ok(self.add_website(website)?.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbError, NewTick, TickStatus};
    use tempfile::NamedTempFile;

    #[test]
    fn test_store_as_source() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let req = NewWebsite::parse("https://example.com", None).unwrap();
        let id = tokio_test::block_on(store.create_website(&req)).unwrap();

        let ticks: Vec<NewTick> = (0..RECENT_TICK_LIMIT + 20)
            .map(|i| NewTick {
                created_at: Some(chrono::Utc::now() - chrono::Duration::seconds(1000 - i as i64)),
                status: TickStatus::Up,
                latency: Some(20.0),
            })
            .collect();
        store.add_ticks(&id, &ticks).unwrap();

        let websites = tokio_test::block_on(store.list_websites()).unwrap();
        assert_eq!(websites.len(), 1);
        assert_eq!(websites[0].ticks.len(), RECENT_TICK_LIMIT);
    }

    #[test]
    fn test_duplicate_surfaces_as_store_error() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let req = NewWebsite::parse("https://example.com", None).unwrap();

        tokio_test::block_on(store.create_website(&req)).unwrap();
        let err = tokio_test::block_on(store.create_website(&req)).unwrap_err();
        assert!(matches!(err, SourceError::Store(DbError::Duplicate(_))));
    }
}
