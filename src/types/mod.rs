mod amount;
mod errors;
mod time;
#[cfg(test)]
mod tests;

use serde::Deserialize;

pub use amount::{checked_add, ensure_positive, round_money};
pub use errors::{Context, ErrorKind, LedgerError, Operation, RecordKind};
pub use time::{checked_days, checked_earlier, checked_later};

pub type RecordId = u64;
pub type MemberId = RecordId;
pub type EntryId = RecordId;
pub type LoanId = RecordId;
pub type FineId = RecordId;
pub type PendingId = RecordId;

/// Group office held by a member. Every role other than `Member` is an admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Treasurer,
    Chairperson,
    Secretary
}

impl Role {
    pub fn is_admin(self) -> bool {
        !matches!(self, Role::Member)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Treasurer => "treasurer",
            Role::Chairperson => "chairperson",
            Role::Secretary => "secretary"
        }
    }
}

/// An already authenticated identity handed to the core by the request handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub member_id: MemberId,
    pub role: Role
}

impl Caller {
    pub fn new(member_id: MemberId, role: Role) -> Self {
        Self { member_id, role }
    }
}
