pub mod analysis;
pub mod catalog;
pub mod client;
pub mod types;

pub use analysis::GeminiAnalysisClient;
pub use catalog::{check_model, rank_candidates, GeminiCatalogClient, ModelInfo};
pub use client::GeminiHttpClient;
