//! Clashmix Library
//!
//! Aggregates multiple remote or inline Clash subscription sources belonging
//! to a named scheme into one merged, deduplicated routing configuration,
//! with region classification, app-rule expansion and proxy-group synthesis.

pub mod assemble;
pub mod catalog;
pub mod compiler;
pub mod merge;
pub mod model;
pub mod outcome;
pub mod region;
pub mod resolver;
pub mod safety;
pub mod settings;
pub mod store;

pub use assemble::Aggregator;
pub use catalog::AppCatalog;
pub use resolver::Resolver;
pub use settings::Settings;
pub use store::SchemeStore;

/// Common error type for the aggregator
pub type Result<T> = anyhow::Result<T>;
