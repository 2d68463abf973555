//! iotsentry - IoT threat-monitoring dashboard.
//!
//! Polls the scoring backend for alerts, projects them into a table and a
//! chart, and hosts the dataset selector and CSV upload form.

pub mod backend;
pub mod config;
pub mod model;
pub mod poller;
pub mod views;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;
