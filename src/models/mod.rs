mod entry;
mod fine;
mod loan;
mod member;
mod pending;

pub use entry::{AfterschoolEntry, SavingsEntry};
pub use fine::{Fine, FineReason};
pub use loan::{Loan, LoanStatus, OverdueStatus};
pub use member::Member;
pub use pending::{PendingKind, PendingStatus, PendingTransaction};
