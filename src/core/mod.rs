pub mod async_impl;
pub mod cache;
pub mod config;
pub mod error;
pub mod hasher;
pub mod monitor;
pub mod stack;
pub mod store;
pub mod sync_impl;
pub mod telemetry;
pub mod value;
pub mod workfunction;
