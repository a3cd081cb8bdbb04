mod reporter;

pub use reporter::{FinancialSummary, LeaderboardEntry, Reporter};
