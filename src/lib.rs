pub mod clock;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod hierarchy;
pub mod history;
pub mod ledger;
pub mod limits;
pub mod model;
pub mod observability;
pub mod service;
pub mod wire;
