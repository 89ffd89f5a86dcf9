//! PostLens Core — canonical post model, configuration, error types.

pub mod config;
pub mod error;
pub mod model;

pub use config::{DataPaths, PostLensConfig};
pub use error::{Error, Result};
pub use model::{MediaItem, Post, RawRecord, Sentiment, UploadBatch, UploadStatus};
