//! horizon: an AI landscape dashboard over tabular datasets.
//!
//! Tables are loaded from a data directory by [`store`], turned into
//! comparisons and rankings by [`engine`], grouped into dashboard panels by
//! [`dashboard`] and presented through the [`cli`] and the embedded [`web`]
//! server.

pub mod activity;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod store;
pub mod web;
