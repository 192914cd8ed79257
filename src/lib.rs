//! Payroll Simulation Engine for civil-servant remuneration
//!
//! This crate resolves an organization's payroll rules from a three-level
//! hierarchical configuration (global, sector, organization) and simulates
//! gross pay, benefits, pension and income-tax withholding, thirteenth
//! salary, vacation, overtime, travel per-diems, leave and function
//! substitution from those rules.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
