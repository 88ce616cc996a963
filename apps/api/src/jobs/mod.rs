// Jobs: stored postings, the dedup-aware ingest pipeline, and the jobs API.

pub mod handlers;
pub mod ingest;
pub mod repository;

pub use ingest::Ingestor;
