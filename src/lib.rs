//! Ledgerchat - Conversational personal-finance ledger driven by a hosted LLM agent

pub mod agent;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod media;
pub mod model;
pub mod session;
pub mod webhook;
