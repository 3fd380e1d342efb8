// Process-wide handle on the loaded record store.
//
// Readers take an `Arc<Snapshot>` and keep it for the whole query; a reload
// builds the new store off to the side and swaps the pointer in one step, so a
// query sees either the old store or the new one, never a mixture.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use crease_core::store::{RecordStore, StoreError};
use crease_core::teams::TeamRegistry;
use tracing::{info, warn};

/// One loaded generation of the store.
#[derive(Debug)]
pub struct Snapshot {
    pub store: RecordStore,
    pub loaded_at: DateTime<Utc>,
    /// Starts at 1 and increases with every successful load.
    pub version: u64,
}

pub struct StoreHandle {
    current: ArcSwap<Snapshot>,
    next_version: AtomicU64,
    source: Option<PathBuf>,
    teams: TeamRegistry,
}

impl StoreHandle {
    /// Load the document at `source` and keep the path for later reloads.
    pub fn open(source: &Path, teams: TeamRegistry) -> Result<Self, StoreError> {
        let store = RecordStore::from_path(source, &teams)?;
        Ok(Self::build(store, Some(source.to_path_buf()), teams))
    }

    /// Wrap an already loaded store. `reload` keeps the current snapshot.
    pub fn from_store(store: RecordStore, teams: TeamRegistry) -> Self {
        Self::build(store, None, teams)
    }

    fn build(store: RecordStore, source: Option<PathBuf>, teams: TeamRegistry) -> Self {
        let snapshot = Snapshot {
            store,
            loaded_at: Utc::now(),
            version: 1,
        };
        Self {
            current: ArcSwap::from_pointee(snapshot),
            next_version: AtomicU64::new(2),
            source,
            teams,
        }
    }

    /// The current snapshot. Hold on to it for the duration of one query.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn teams(&self) -> &TeamRegistry {
        &self.teams
    }

    /// Re-read the source document and swap it in.
    ///
    /// On failure the previous snapshot stays current and the error is
    /// returned.
    pub fn reload(&self) -> Result<Arc<Snapshot>, StoreError> {
        let Some(source) = &self.source else {
            return Ok(self.snapshot());
        };
        match RecordStore::from_path(source, &self.teams) {
            Ok(store) => Ok(self.replace(store)),
            Err(e) => {
                warn!(
                    "reload of {} failed, keeping version {}: {}",
                    source.display(),
                    self.snapshot().version,
                    e
                );
                Err(e)
            }
        }
    }

    /// Swap in `store` as the new current snapshot.
    pub fn replace(&self, store: RecordStore) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot {
            store,
            loaded_at: Utc::now(),
            version: self.next_version.fetch_add(1, Ordering::SeqCst),
        });
        self.current.store(Arc::clone(&snapshot));
        info!(
            "store version {} active ({} blocks)",
            snapshot.version,
            snapshot.store.blocks().len()
        );
        snapshot
    }
}
