//! Opened application state shared by the commands

use std::rc::Rc;

use anyhow::Result;
use tracing::debug;

use dex_core::{CollectionSlot, CollectionStore, Config, EntryCache, SqliteKv};

pub type Kv = Rc<SqliteKv>;

/// The collection and entry cache over one database
pub struct AppContext {
    pub config: Config,
    pub kv: Kv,
    pub store: CollectionStore<CollectionSlot<Kv>>,
    pub cache: EntryCache<Kv>,
}

impl AppContext {
    /// Open the database under the configured data directory
    pub fn open(config: Config) -> Result<Self> {
        let path = config.sqlite_path();
        let kv = match SqliteKv::open(&path) {
            Ok(kv) => kv.with_quota(config.storage_quota),
            Err(e) => {
                let message = match e.recovery_suggestion() {
                    Some(hint) => format!("Failed to open database: {:?}. {}", path, hint),
                    None => format!("Failed to open database: {:?}", path),
                };
                return Err(anyhow::Error::new(e).context(message));
            }
        };
        debug!("Opened database at {:?}", path);

        Ok(Self::from_kv(config, Rc::new(kv)))
    }

    /// Build over an already opened store
    pub fn from_kv(config: Config, kv: Kv) -> Self {
        let store = CollectionStore::open(CollectionSlot::new(Rc::clone(&kv)));
        let cache = EntryCache::new(Rc::clone(&kv));
        Self {
            config,
            kv,
            store,
            cache,
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        let kv = SqliteKv::open_in_memory().expect("in-memory database");
        Self::from_kv(Config::default(), Rc::new(kv))
    }
}
