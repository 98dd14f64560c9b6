pub mod ai_analysis;
pub mod cli;
pub mod config;
pub mod ensemble;
pub mod expert;
pub mod explanation;
pub mod football_api;
pub mod http_client;
pub mod logging;
pub mod model;
pub mod predictor;
pub mod seeded;
pub mod source;
pub mod statistical;
pub mod store;
pub mod ttl_cache;
pub mod web_aggregation;
