pub mod api;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod humanize;
pub mod ledger;
pub mod normalize;
pub mod observability;
pub mod recorder;
pub mod registry;
