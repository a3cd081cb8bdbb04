use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::Member;
use crate::storage::Storage;
use crate::types::{round_money, MemberId, Role};

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    pub member_id: MemberId,
    pub role: Role,
    pub balance: Decimal,
    pub last_activity_at: Option<DateTime<Utc>>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinancialSummary {
    pub total_savings: Decimal,
    pub total_afterschool: Decimal,
    /// Remaining amount on every approved loan.
    pub outstanding_loans: Decimal,
    pub unpaid_fines: Decimal,
    /// Savings plus outstanding loans plus unpaid fines.
    pub total: Decimal
}

/// Read-only figures for dashboards, recomputed from the store on every call.
pub struct Reporter<S: Storage> {
    storage: Arc<S>,
    group_goal: Decimal
}

impl<S: Storage> Reporter<S> {
    pub fn new(storage: Arc<S>, group_goal: Decimal) -> Self {
        Self { storage, group_goal }
    }

    pub fn total_savings(&self) -> Decimal {
        sum(self.storage.savings().iter().map(|entry| entry.amount))
    }

    /// Members by balance, highest first. Ties go to whoever saved earliest,
    /// members who never saved come last.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut members = self.storage.members();
        members.sort_by(compare_standing);

        members.into_iter().enumerate()
            .map(|(index, member)| LeaderboardEntry {
                rank: index + 1,
                member_id: member.member_id,
                role: member.role,
                balance: member.balance,
                last_activity_at: member.last_activity_at
            })
            .collect()
    }

    pub fn financial_summary(&self) -> FinancialSummary {
        let total_savings = self.total_savings();
        let total_afterschool = sum(self.storage.afterschool().iter().map(|entry| entry.amount));
        let outstanding_loans = sum(self.storage.loans().iter()
            .filter(|loan| loan.is_approved())
            .map(|loan| loan.remaining()));
        let unpaid_fines = sum(self.storage.fines().iter()
            .filter(|fine| !fine.paid)
            .map(|fine| fine.amount));

        FinancialSummary {
            total_savings,
            total_afterschool,
            outstanding_loans,
            unpaid_fines,
            total: sum([total_savings, outstanding_loans, unpaid_fines])
        }
    }

    /// Percentage of the configured group goal reached by total savings.
    pub fn goal_progress(&self) -> Decimal {
        self.goal_progress_towards(self.group_goal)
    }

    /// Percentage of `goal` reached, capped at 100. A non-positive goal reports 0.
    pub fn goal_progress_towards(&self, goal: Decimal) -> Decimal {
        if goal <= Decimal::ZERO {
            return Decimal::ZERO
        }

        let hundred = Decimal::ONE_HUNDRED;
        let progress = self.total_savings()
            .checked_div(goal)
            .and_then(|ratio| ratio.checked_mul(hundred))
            .unwrap_or(hundred);

        round_money(progress.min(hundred))
    }
}

fn sum(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}

fn compare_standing(left: &Member, right: &Member) -> Ordering {
    right.balance.cmp(&left.balance)
        .then_with(|| match (left.last_activity_at, right.last_activity_at) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal
        })
        .then_with(|| left.member_id.cmp(&right.member_id))
}
