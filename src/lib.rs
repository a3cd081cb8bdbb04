//! Ledger core for a savings and credit cooperative: member balances, savings
//! and afterschool contributions, loans with interest and overdue penalties,
//! fines, and an approval gateway for member submitted payments.

pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod fines;
pub mod gateway;
pub mod loans;
pub mod models;
pub mod reporting;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;
