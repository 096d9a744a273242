//! Branch-selecting deployment tool for a systemd-managed Python service.
//!
//! This crate provides two procedures:
//! - `update`: pick a branch from a ranked menu, check it out (creating a
//!   tracking branch if needed), pull it, reinstall dependencies, run the
//!   migration entrypoint and restart the service
//! - `setup`: provision the virtualenv, retire a legacy unit and register
//!   the service with systemd

pub mod branch;
pub mod config;
pub mod deploy;
pub mod error;
pub mod git;
pub mod output;
pub mod prompt;
pub mod python;
pub mod runner;
pub mod systemd;
