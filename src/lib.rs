pub mod config;
pub mod images;
pub mod observability;
pub mod pool;
