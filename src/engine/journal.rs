use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::models::PendingKind;
use crate::types::{Caller, MemberId, RecordId, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    Register,
    Deposit,
    Afterschool,
    SubmitSavings,
    SubmitAfterschool,
    SubmitLoan,
    SubmitRepayment,
    SubmitFinePayment,
    Approve,
    Reject,
    RequestLoan,
    ApproveLoan,
    RejectLoan,
    Repay,
    IssueFine,
    PayFine,
    Interest,
    Penalty,
    FlagInactive
}

/// A single row of the journal CSV, before validation.
///
/// Only `at`, `command`, `caller` and `role` are always required, the rest
/// depends on the command. For `register` the caller columns describe the
/// member being registered.
#[derive(Debug, Clone, Deserialize)]
pub struct JournalRecord {
    /// Time the command was issued, the ledger clock is set to it before applying.
    pub at: DateTime<Utc>,
    pub command: CommandName,
    pub caller: MemberId,
    pub role: Role,
    pub member: Option<MemberId>,
    pub amount: Option<Decimal>,
    /// Pending transaction, loan or fine the command acts on.
    pub target: Option<RecordId>,
    pub reason: Option<String>
}

impl JournalRecord {
    pub fn caller(&self) -> Caller {
        Caller::new(self.caller, self.role)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum JournalError {
    #[error("Journal error: [{command:?}] requires the [{field}] column")]
    MissingField {
        command: CommandName,
        field: &'static str
    }
}

/// A validated, typed journal command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Register { member_id: MemberId, role: Role },
    DepositSavings { member_id: MemberId, amount: Decimal },
    DepositAfterschool { member_id: MemberId, amount: Decimal },
    Submit { member_id: MemberId, kind: PendingKind, amount: Decimal },
    Approve { pending_id: RecordId },
    Reject { pending_id: RecordId, reason: String },
    RequestLoan { member_id: MemberId, principal: Decimal, reason: String },
    ApproveLoan { loan_id: RecordId },
    RejectLoan { loan_id: RecordId, reason: String },
    Repay { loan_id: RecordId, amount: Decimal },
    IssueFine { member_id: MemberId, amount: Decimal, reason: String },
    PayFine { fine_id: RecordId },
    ApplyInterest,
    ApplyPenalty,
    FlagInactive
}

impl TryFrom<&JournalRecord> for Command {
    type Error = JournalError;

    fn try_from(record: &JournalRecord) -> Result<Self, Self::Error> {
        let command = record.command;
        let missing = |field| JournalError::MissingField { command, field };

        //NOTE: Submissions default to the caller as the member, officials' commands must name one.
        let own_member = || record.member.unwrap_or(record.caller);
        let member = || record.member.ok_or_else(|| missing("member"));
        let amount = || record.amount.ok_or_else(|| missing("amount"));
        let target = || record.target.ok_or_else(|| missing("target"));
        let reason = || record.reason.clone().unwrap_or_default();

        let submit = |kind: PendingKind| -> Result<Command, JournalError> {
            Ok(Command::Submit { member_id: own_member(), kind, amount: amount()? })
        };

        match command {
            CommandName::Register => Ok(Command::Register { member_id: record.caller, role: record.role }),
            CommandName::Deposit => Ok(Command::DepositSavings { member_id: member()?, amount: amount()? }),
            CommandName::Afterschool => Ok(Command::DepositAfterschool { member_id: member()?, amount: amount()? }),
            CommandName::SubmitSavings => submit(PendingKind::Savings),
            CommandName::SubmitAfterschool => submit(PendingKind::Afterschool),
            CommandName::SubmitLoan => submit(PendingKind::LoanRequest { reason: reason() }),
            CommandName::SubmitRepayment => submit(PendingKind::LoanRepayment { loan_id: target()? }),
            CommandName::SubmitFinePayment => submit(PendingKind::FinePayment { fine_id: target()? }),
            CommandName::Approve => Ok(Command::Approve { pending_id: target()? }),
            CommandName::Reject => Ok(Command::Reject { pending_id: target()?, reason: reason() }),
            CommandName::RequestLoan => Ok(Command::RequestLoan { member_id: member()?, principal: amount()?, reason: reason() }),
            CommandName::ApproveLoan => Ok(Command::ApproveLoan { loan_id: target()? }),
            CommandName::RejectLoan => Ok(Command::RejectLoan { loan_id: target()?, reason: reason() }),
            CommandName::Repay => Ok(Command::Repay { loan_id: target()?, amount: amount()? }),
            CommandName::IssueFine => Ok(Command::IssueFine { member_id: member()?, amount: amount()?, reason: reason() }),
            CommandName::PayFine => Ok(Command::PayFine { fine_id: target()? }),
            CommandName::Interest => Ok(Command::ApplyInterest),
            CommandName::Penalty => Ok(Command::ApplyPenalty),
            CommandName::FlagInactive => Ok(Command::FlagInactive)
        }
    }
}
