pub mod cache;
pub mod classify;
pub mod config;
pub mod currency;
pub mod enrich;
pub mod info;
pub mod log;
pub mod price;
pub mod valuation;
