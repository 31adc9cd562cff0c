// Deduplicated sample loading.
//
// Each sample id gets one `OnceCell`. The first caller runs the fetch and
// decode, everyone who shows up while it is running waits on the same cell,
// and whatever comes out (a decoded entry or a failure) is kept for the
// lifetime of the cache. Failures are never retried.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::fetch::Fetch;
use crate::audio::SampleBuffer;
use crate::error::LoadError;
use crate::pipeline::{AudioConfig, SampleDescriptor};

/// A decoded sample plus its time-reversed twin.
#[derive(Debug)]
pub struct CacheEntry {
    pub buffer: Arc<SampleBuffer>,
    pub reversed: Arc<SampleBuffer>,
}

impl CacheEntry {
    pub fn new(buffer: SampleBuffer) -> Self {
        let reversed = buffer.reversed();
        Self {
            buffer: Arc::new(buffer),
            reversed: Arc::new(reversed),
        }
    }

    pub fn pick(&self, reverse: bool) -> &Arc<SampleBuffer> {
        if reverse { &self.reversed } else { &self.buffer }
    }
}

// `None` inside the cell is the "tried and failed" marker
type Slot = Arc<OnceCell<Option<Arc<CacheEntry>>>>;

pub struct SampleCache {
    fetcher: Arc<dyn Fetch>,
    library: RwLock<Arc<HashMap<String, SampleDescriptor>>>,
    entries: Mutex<HashMap<String, Slot>>,
}

impl SampleCache {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            library: RwLock::new(Arc::default()),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Point id lookups at the library of `config`. Already cached entries stay.
    pub fn set_library(&self, config: &AudioConfig) {
        let library = config
            .sample_library
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect();
        *self.library.write() = Arc::new(library);
    }

    /// Resolve a sample id to decoded audio. `None` when the id is unknown,
    /// has no file, or failed to load (now or on an earlier attempt).
    pub async fn resolve(&self, sample_id: &str) -> Option<Arc<CacheEntry>> {
        let file = {
            let library = self.library.read();
            let descriptor = library.get(sample_id)?;
            if descriptor.file.is_empty() {
                return None;
            }
            descriptor.file.clone()
        };

        let slot = self
            .entries
            .lock()
            .entry(sample_id.to_string())
            .or_default()
            .clone();

        slot.get_or_init(|| self.load(sample_id, &file))
            .await
            .clone()
    }

    /// Load every sample the config's tracks point at, all at once. One bad
    /// sample doesn't hold up or fail the rest.
    pub async fn prepare_all(&self, config: &AudioConfig) {
        let ids = config.referenced_sample_ids();
        debug!(count = ids.len(), "preparing samples");
        let results = join_all(ids.iter().map(|id| self.resolve(id))).await;
        let loaded = results.iter().filter(|r| r.is_some()).count();
        debug!(loaded, requested = ids.len(), "sample preparation settled");
    }

    /// What the cache currently holds for `sample_id`: `None` if nothing has
    /// finished loading, `Some(None)` for a remembered failure.
    pub fn peek(&self, sample_id: &str) -> Option<Option<Arc<CacheEntry>>> {
        let entries = self.entries.lock();
        entries.get(sample_id)?.get().cloned()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    async fn load(&self, sample_id: &str, file: &str) -> Option<Arc<CacheEntry>> {
        match self.try_load(file).await {
            Ok(entry) => {
                info!(
                    sample_id,
                    frames = entry.buffer.len(),
                    channels = entry.buffer.channel_count(),
                    sample_rate = entry.buffer.sample_rate,
                    "sample loaded"
                );
                Some(Arc::new(entry))
            }
            Err(e) => {
                warn!(sample_id, uri = file, error = %e, "failed to load sample");
                None
            }
        }
    }

    async fn try_load(&self, file: &str) -> Result<CacheEntry, LoadError> {
        let bytes = self.fetcher.fetch(file).await?;
        let extension = extension_hint(file);
        // decoding is cpu-bound, keep it off the scheduler's thread
        tokio::task::spawn_blocking(move || {
            let buffer = SampleBuffer::decode(bytes, extension.as_deref())?;
            Ok::<_, LoadError>(CacheEntry::new(buffer))
        })
        .await?
    }
}

// "kit/snare.flac?v=2" -> "flac"
fn extension_hint(file: &str) -> Option<String> {
    let path = file.split(['?', '#']).next().unwrap_or(file);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
}
