//! Shared helpers for integration tests

#![allow(dead_code)]

use plcstream::config::AppConfig;
use plcstream::device::{LinkPool, MockLink, SlotFailure};

/// Build a pool of mock links, one per slot
pub fn mock_pool<F>(sessions: usize, mut make: F) -> (LinkPool, Vec<SlotFailure>)
where
    F: FnMut(usize) -> MockLink,
{
    LinkPool::build(sessions, |slot| Box::new(make(slot)))
}

/// Configuration tuned for fast test runs
pub fn test_config(total_jobs: u64, sessions: usize, workers: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.pipeline.sessions = sessions;
    config.pipeline.workers = workers;
    config.pipeline.total_jobs = total_jobs;
    config.pipeline.pace_interval_us = 1;
    config.pipeline.token_capacity = 64;
    config.pipeline.result_capacity = 64;
    config.pipeline.report_every = 1_000_000;
    config.read.register_count = 4;
    config
}
