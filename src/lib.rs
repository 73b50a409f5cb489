//! Migrate content between hubs of a hosted content service
//!
//! The hub clone pipeline, the copy/move orchestrator and the revert engine
//! all record their effects in an [`action_log::ActionLog`] that can later be
//! replayed to undo them.

pub mod action_log;
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod copy;
pub mod handlers;
pub mod mapping;
pub mod pipeline;
pub mod revert;
pub mod ui;
