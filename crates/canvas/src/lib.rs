pub mod agent;
pub mod cache;
pub mod configuration;
pub mod coordinator;
pub mod errors;
pub mod image_tools;
pub mod images;
pub mod literal;
pub mod models;
pub mod outcome;
pub mod providers;
pub mod result_parser;
pub mod systems;
