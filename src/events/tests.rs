use anyhow::Result;

use super::{EventSink, LedgerEvent, RecordingSink, TracingSink};
use crate::test_support::{amount, MEMBER};

#[test]
fn test_recording_sink_keeps_publication_order() -> Result<()> {
    let sink = RecordingSink::default();

    sink.publish(LedgerEvent::FineIssued { member_id: MEMBER, fine_id: 1, amount: amount("50")? });
    sink.publish(LedgerEvent::LoanApproved { member_id: MEMBER, loan_id: 4 });
    TracingSink.publish(LedgerEvent::LoanClosed { member_id: MEMBER, loan_id: 4 });

    assert!(matches!(sink.events().as_slice(), [
        LedgerEvent::FineIssued { fine_id: 1, .. },
        LedgerEvent::LoanApproved { loan_id: 4, .. }
    ]));

    Ok(())
}
