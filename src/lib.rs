//! Payroll Engine for Japanese payroll
//!
//! This crate calculates monthly and bonus payroll: gross pay, social insurance
//! premiums (health, nursing care, pension, employment, workers' compensation),
//! withholding income tax and resident tax special collection. It also evaluates
//! standard monthly remuneration grades and imports resident tax notices.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
