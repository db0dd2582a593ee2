pub mod cli;
pub mod combo;
pub mod config;
pub mod export;
pub mod handicap;
pub mod ingest;
pub mod league_stats;
pub mod model;
pub mod movement;
pub mod odds;
pub mod pipeline;
pub mod priors;
pub mod review;
pub mod scorer;
pub mod settlement;
pub mod store;
