//! Service layer: the engine behind the HTTP routes.
//!
//! Classification and aggregation are pure functions. The stateful services
//! (`PriceCatalog`, `ArtifactLibrary`, `EstimateBook`) each own one table and
//! persist it through a [`LocalCache`] handle.

pub mod aggregator;
pub mod artifacts;
pub mod catalog;
pub mod classifier;
pub mod editor;
pub mod estimates;
pub mod estimator;
pub mod events;
pub mod local_cache;
pub mod random;
pub mod remote;
pub mod store;
pub mod sync;

pub use aggregator::ProjectSort;
pub use artifacts::ArtifactLibrary;
pub use catalog::{DeleteOutcome, EditView, PriceCatalog};
pub use estimates::EstimateBook;
pub use estimator::BidEstimator;
pub use events::EventBus;
pub use local_cache::LocalCache;
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use remote::{HttpCatalogClient, OfflineCatalog, RemoteCatalog, RemoteError};
pub use store::{FileStore, MemoryStore, RedisStore, SnapshotStore, StoreError};
