//! adlift - CTR analysis and click prediction for ad campaign data
//!
//! This library loads Facebook-style campaign exports and runs three stages
//! over them: an exploratory CTR summary, a simulated A/B significance test
//! (two-proportion z-test), and a small neural click classifier evaluated on
//! a held-out split.

pub mod ab_test;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod eda;
pub mod html_report;
pub mod predictor;
