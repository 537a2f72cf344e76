#![doc = "repo-census-core: aggregation engine for repo-census."]

//! This crate contains the census logic, data models and collaborator traits for repo-census.
//! HTTP transport, credentials and terminal output live in the CLI crate.
//!
//! # Usage
//! Implement [`contract::RepositoryProvider`] and [`contract::ContentFetcher`] for a hosting
//! platform, call [`aggregate::run_census`], then render with [`format::format_report`].

pub mod aggregate;
pub mod analyzer;
pub mod cancel;
pub mod config;
pub mod contract;
pub mod decode;
pub mod error;
pub mod format;
pub mod keywords;
pub mod languages;
pub mod lines;
