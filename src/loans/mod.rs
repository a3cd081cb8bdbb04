mod loan_engine;

pub use loan_engine::{AccrualSummary, LoanEngine};
