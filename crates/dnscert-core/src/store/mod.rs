// # Store Implementations
//
// Account and certificate persistence backends. Both backends implement
// `AccountStore` and `CertificateStore`.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::traits::{AccountStore, CertificateStore};

/// Stores opened from a [`StorageConfig`]
#[derive(Clone)]
pub struct Stores {
    /// Account persistence
    pub accounts: Arc<dyn AccountStore>,

    /// Certificate persistence
    pub certificates: Arc<dyn CertificateStore>,
}

impl StorageConfig {
    /// Open the configured backend
    ///
    /// One backend instance serves both stores.
    pub fn open(&self) -> Stores {
        match self {
            StorageConfig::File { path } => {
                let store = Arc::new(FileStore::new(path));
                Stores {
                    accounts: store.clone(),
                    certificates: store,
                }
            }
            StorageConfig::Memory => {
                let store = Arc::new(MemoryStore::new());
                Stores {
                    accounts: store.clone(),
                    certificates: store,
                }
            }
        }
    }
}
