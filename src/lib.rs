pub mod clock;
pub mod config;
pub mod duration;
pub mod format;
pub mod fx;
pub mod models;
pub mod report;
pub mod storage;
