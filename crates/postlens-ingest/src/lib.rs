//! PostLens Ingest — format parsers, record normalization, ingestion coordination.

pub mod ingest;
pub mod normalize;
pub mod parse;

pub use ingest::{IngestCoordinator, IngestOutcome};
pub use normalize::normalize;
pub use parse::FileKind;
