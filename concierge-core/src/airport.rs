use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// One row of the airport directory (`iata-icao.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub iata: String,
    #[serde(default)]
    pub icao: String,
    pub airport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
}

impl AirportRecord {
    /// Case-insensitive substring match against codes, name and region.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.iata.to_lowercase().contains(needle)
            || self.icao.to_lowercase().contains(needle)
            || self.airport.to_lowercase().contains(needle)
            || self
                .region_name
                .as_deref()
                .is_some_and(|r| r.to_lowercase().contains(needle))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryLoadError {
    #[error("Airport directory request failed: {0}")]
    Network(String),
    #[error("Airport directory returned status {0}")]
    Status(u16),
    #[error("Airport directory is not valid JSON: {0}")]
    Parse(String),
}

/// Where the airport list comes from.
#[async_trait]
pub trait AirportSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<AirportRecord>, DirectoryLoadError>;
}

/// Read-only airport list shared by every autocomplete field of a page.
#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    records: Vec<AirportRecord>,
}

impl AirportDirectory {
    pub fn new(records: Vec<AirportRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Fetches the directory. The returned sequence is consumed once; call
    /// `load` again to re-fetch.
    pub async fn load(
        source: &dyn AirportSource,
    ) -> Result<std::vec::IntoIter<AirportRecord>, DirectoryLoadError> {
        Ok(source.fetch().await?.into_iter())
    }

    pub fn records(&self) -> &[AirportRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&AirportRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<AirportRecord> for AirportDirectory {
    fn from_iter<I: IntoIterator<Item = AirportRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Loads the directory at most once and hands out shared copies.
///
/// A failed load is logged and cached as an empty directory, so autocomplete
/// degrades to "no suggestions" instead of failing the page.
pub struct DirectoryLoader {
    source: Arc<dyn AirportSource>,
    directory: OnceCell<Arc<AirportDirectory>>,
}

impl DirectoryLoader {
    pub fn new(source: Arc<dyn AirportSource>) -> Self {
        Self {
            source,
            directory: OnceCell::new(),
        }
    }

    pub async fn get_or_load(&self) -> Arc<AirportDirectory> {
        self.directory
            .get_or_init(|| async {
                match AirportDirectory::load(self.source.as_ref()).await {
                    Ok(records) => {
                        let directory: AirportDirectory = records.collect();
                        info!("Loaded airport directory: {} airports", directory.len());
                        Arc::new(directory)
                    }
                    Err(e) => {
                        error!("Failed to load airport directory: {}", e);
                        Arc::new(AirportDirectory::empty())
                    }
                }
            })
            .await
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.directory.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AirportSource for CountingSource {
        async fn fetch(&self) -> Result<Vec<AirportRecord>, DirectoryLoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DirectoryLoadError::Status(503));
            }
            Ok(vec![AirportRecord {
                iata: "DFW".into(),
                icao: "KDFW".into(),
                airport: "Dallas Fort Worth".into(),
                region_name: Some("Texas".into()),
            }])
        }
    }

    #[test]
    fn test_record_deserialization_without_region() {
        let json = r#"{"iata":"LHR","icao":"EGLL","airport":"London Heathrow"}"#;
        let record: AirportRecord = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(record.iata, "LHR");
        assert!(record.region_name.is_none());
    }

    #[tokio::test]
    async fn test_loader_fetches_once() {
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0), fail: false });
        let loader = DirectoryLoader::new(source.clone());

        let (a, b) = tokio::join!(loader.get_or_load(), loader.get_or_load());
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_degrades_to_empty() {
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0), fail: true });
        let loader = DirectoryLoader::new(source);
        assert!(loader.get_or_load().await.is_empty());
    }

    #[tokio::test]
    async fn test_fresh_load_refetches() {
        let source = CountingSource { calls: AtomicUsize::new(0), fail: false };
        let first: Vec<_> = AirportDirectory::load(&source).await.unwrap().collect();
        let second: Vec<_> = AirportDirectory::load(&source).await.unwrap().collect();
        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
