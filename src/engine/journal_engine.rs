use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use mockable::Clock;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{spawn_blocking, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::clock::ReplayClock;
use crate::engine::journal::{Command, JournalError, JournalRecord};
use crate::engine::Sacco;
use crate::storage::Storage;
use crate::types::{Caller, LedgerError};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Journal row at [{at}] is earlier than the ledger clock [{now}]")]
    OutOfOrder {
        at: DateTime<Utc>,
        now: DateTime<Utc>
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub rejected: usize,
    pub malformed: usize
}

/// Replays a command journal against a ledger.
///
/// The CSV is parsed on a blocking task and streamed through a bounded channel.
/// Commands are applied one at a time in file order, with the ledger clock set
/// to each row's timestamp first, so accruals and overdue checks see the time
/// the command was issued. A rejected command is logged and the replay moves on.
pub struct JournalEngine<S: Storage> {
    sacco: Sacco<S>,
    clock: Arc<ReplayClock>,
    backpressure: usize
}

impl<S: Storage> JournalEngine<S> {
    /// `clock` must be the clock the ledger's storage reads from.
    pub fn new(sacco: Sacco<S>, clock: Arc<ReplayClock>) -> Self {
        Self {
            sacco,
            clock,
            backpressure: 256
        }
    }

    pub fn sacco(&self) -> &Sacco<S> {
        &self.sacco
    }

    pub async fn run(&self, path: &str) -> anyhow::Result<ReplayStats> {
        let (sender, receiver) = mpsc::channel::<JournalRecord>(self.backpressure);
        let csv_handle = spawn_csv_reader(path.to_string(), sender);
        let mut stats = self.process_records(receiver).await;

        match csv_handle.await {
            Ok(malformed) => stats.malformed = malformed,
            Err(error) => error!("Journal ingestion failed: {error}")
        }

        info!("Journal replay finished: [{}] applied, [{}] rejected, [{}] malformed", stats.applied, stats.rejected, stats.malformed);

        Ok(stats)
    }

    /// Applies one journal row.
    pub fn apply(&self, record: &JournalRecord) -> Result<(), ReplayError> {
        let now = self.clock.utc();

        if record.at < now {
            return Err(ReplayError::OutOfOrder { at: record.at, now })
        }

        let command = Command::try_from(record)?;
        self.clock.set(record.at);
        self.dispatch(&record.caller(), command)?;

        Ok(())
    }

    async fn process_records(&self, mut receiver: mpsc::Receiver<JournalRecord>) -> ReplayStats {
        let mut stats = ReplayStats::default();

        //NOTE: Rows must be applied in file order, the clock only moves forward.
        while let Some(record) = receiver.recv().await {
            match self.apply(&record) {
                Ok(()) => {
                    stats.applied += 1;
                    debug!("Journal [{:?}] by [{}] applied at [{}]", record.command, record.caller, record.at);
                }
                Err(error) => {
                    stats.rejected += 1;
                    warn!("Journal [{:?}] by [{}] at [{}] rejected: {error}", record.command, record.caller, record.at);
                }
            }
        }

        stats
    }

    fn dispatch(&self, caller: &Caller, command: Command) -> Result<(), LedgerError> {
        let sacco = &self.sacco;

        match command {
            Command::Register { member_id, role } => {
                sacco.register_member(member_id, role)?;
            }
            Command::DepositSavings { member_id, amount } => {
                sacco.deposit_savings(caller, member_id, amount)?;
            }
            Command::DepositAfterschool { member_id, amount } => {
                sacco.deposit_afterschool(caller, member_id, amount)?;
            }
            Command::Submit { member_id, kind, amount } => {
                sacco.submit(caller, member_id, kind, amount)?;
            }
            Command::Approve { pending_id } => {
                sacco.approve(caller, pending_id)?;
            }
            Command::Reject { pending_id, reason } => {
                sacco.reject(caller, pending_id, reason)?;
            }
            Command::RequestLoan { member_id, principal, reason } => {
                sacco.request_loan(caller, member_id, principal, reason)?;
            }
            Command::ApproveLoan { loan_id } => {
                sacco.approve_loan(caller, loan_id)?;
            }
            Command::RejectLoan { loan_id, reason } => {
                sacco.reject_loan(caller, loan_id, reason)?;
            }
            Command::Repay { loan_id, amount } => {
                sacco.repay(caller, loan_id, amount)?;
            }
            Command::IssueFine { member_id, amount, reason } => {
                sacco.issue_fine(caller, member_id, amount, reason)?;
            }
            Command::PayFine { fine_id } => {
                sacco.pay_fine(caller, fine_id)?;
            }
            Command::ApplyInterest => {
                sacco.apply_interest_batch();
            }
            Command::ApplyPenalty => {
                sacco.apply_penalty_batch();
            }
            Command::FlagInactive => {
                sacco.flag_inactive_members()?;
            }
        }

        Ok(())
    }
}

/// Returns the number of rows that could not be deserialized.
fn spawn_csv_reader(path: String, sender: mpsc::Sender<JournalRecord>) -> JoinHandle<usize> {
    spawn_blocking(move || {
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(error) => {
                error!("Error opening journal at path: {path} | {error}");
                return 0;
            }
        };

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut malformed = 0;

        for result in reader.deserialize::<JournalRecord>() {
            match result {
                Ok(record) => {
                    if sender.blocking_send(record).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    malformed += 1;
                    error!("Journal deserialization error: {error}");
                }
            }
        }

        malformed
    })
}
