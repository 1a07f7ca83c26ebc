//! News impact scoring engine.
//!
//! Two flows share one cache slot: a producer job (scheduled, or the
//! `cron` route) that collects RSS headlines and scores them through
//! Gemini, and a request gateway that authenticates callers and serves
//! the cached result.

pub mod analysis;
pub mod config;
pub mod feed;
pub mod gateway;
pub mod producer;
pub mod storage;
