use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::events::{EventSink, LedgerEvent};
use crate::models::Fine;
use crate::storage::Storage;
use crate::types::{checked_days, checked_earlier, ensure_positive, Context, FineId, LedgerError, MemberId, Operation, RecordKind};

/// Issues fines, settles them, and flags members who stopped saving.
pub struct FineEngine<S: Storage> {
    storage: Arc<S>,
    events: Arc<dyn EventSink>,
    inactivity_threshold_days: i64,
    inactivity_fine: Decimal
}

impl<S: Storage> FineEngine<S> {
    pub fn new(storage: Arc<S>, events: Arc<dyn EventSink>, config: &LedgerConfig) -> Self {
        Self {
            storage,
            events,
            inactivity_threshold_days: config.inactivity_threshold_days,
            inactivity_fine: config.inactivity_fine
        }
    }

    /// # Errors
    /// `InvalidAmount` when `amount` is not positive, `NotFound` for an unknown member.
    pub fn issue_fine(&self, member_id: MemberId, amount: Decimal, reason: impl Into<String>) -> Result<Fine, LedgerError> {
        let fine = self.storage.record_fine(member_id, amount, reason.into())?;
        self.publish_issued(&fine);

        Ok(fine)
    }

    /// # Errors
    /// `AlreadyPaid` on every call after the first successful one.
    pub fn pay_fine(&self, fine_id: FineId) -> Result<Fine, LedgerError> {
        let fine = self.storage.mark_fine_paid(fine_id)?;
        debug!("Fine [{}] for member [{}] settled", fine.fine_id, fine.member_id);

        Ok(fine)
    }

    pub fn fines_for(&self, member_id: MemberId) -> Vec<Fine> {
        self.storage.fines().into_iter()
            .filter(|fine| fine.member_id == member_id)
            .collect()
    }

    /// Runs the inactivity scan with the configured threshold.
    pub fn flag_inactive_members(&self) -> Result<Vec<Fine>, LedgerError> {
        self.flag_inactive_members_after(self.inactivity_threshold_days)
    }

    /// Fines every member with no savings activity in the last `threshold_days`.
    ///
    /// Members who still have an unpaid inactivity fine are skipped, so re-running
    /// the scan without new activity issues nothing.
    pub fn flag_inactive_members_after(&self, threshold_days: i64) -> Result<Vec<Fine>, LedgerError> {
        let context = Context::batch(RecordKind::Member, Operation::FlagInactive);
        ensure_positive(Decimal::from(threshold_days), context)?;

        let cutoff = checked_earlier(self.storage.now(), checked_days(threshold_days, context)?, context)?;
        let mut issued = Vec::new();

        for member in self.storage.members() {
            if !member.is_inactive(cutoff) {
                continue;
            }

            match self.storage.record_inactivity_fine(member.member_id, self.inactivity_fine) {
                Ok(Some(fine)) => {
                    self.publish_issued(&fine);
                    issued.push(fine);
                }
                Ok(None) => {
                    debug!("Member [{}] already has an open inactivity fine", member.member_id);
                }
                Err(error) => {
                    //NOTE: One member failing must not stop the scan, the next run picks them up again.
                    warn!("{error}");
                }
            }
        }

        info!("Inactivity scan issued [{}] fines with a [{}] day threshold", issued.len(), threshold_days);

        Ok(issued)
    }

    fn publish_issued(&self, fine: &Fine) {
        self.events.publish(LedgerEvent::FineIssued {
            member_id: fine.member_id,
            fine_id: fine.fine_id,
            amount: fine.amount
        });
    }
}
