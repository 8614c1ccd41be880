pub mod cache;
pub mod config;
pub mod feedback;
pub mod repo;
pub mod run;
pub mod stats;
