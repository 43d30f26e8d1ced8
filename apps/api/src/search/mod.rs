// Job search pipeline: normalize → aggregate → classify.
// The only LLM call here is the classifier's scored tier, through llm_client.

pub mod aggregator;
pub mod classifier;
pub mod handlers;
pub mod normalizer;
pub mod prompts;
pub mod service;
