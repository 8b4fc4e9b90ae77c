pub mod filter;
pub mod intent;
pub mod llm;
pub mod recommender;
pub mod retrieval;
pub mod scoring;
