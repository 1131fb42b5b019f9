//! Batched letter delivery.
//!
//! Walks the assembled scope in store-sized batches and, per subject, writes
//! the letter record, attempts delivery, and stamps `sent_at` on success.
//! Delivery failures are logged and skipped; store failures abort the run.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::scope::Scope;
use crate::store::{EntityStore, LetterSender, RecordStore, StoreError};

pub(super) fn send_letters(
    entities: &dyn EntityStore,
    records: &dyn RecordStore,
    sender: &dyn LetterSender,
    flight: &str,
    letter_type: &str,
    scope: &Scope,
    now: NaiveDateTime,
    batch: usize,
) -> Result<(), StoreError> {
    let mut sent: u64 = 0;
    let mut failed: u64 = 0;

    for subject in entities.find_each(scope, batch) {
        let subject = subject?;
        // The record is written before the attempt, so a crash mid-delivery
        // shows up as a created-but-unsent letter instead of a double send.
        let record = records.create(&subject, letter_type, flight, now)?;
        match sender.deliver(&subject, letter_type, flight) {
            Ok(()) => {
                records.mark_sent(&record, now)?;
                sent += 1;
            }
            Err(error) => {
                warn!(
                    flight,
                    letter = letter_type,
                    subject_id = subject.id,
                    subject_kind = %subject.kind,
                    %error,
                    "letter delivery failed, skipping subject"
                );
                failed += 1;
            }
        }
    }

    if sent > 0 || failed > 0 {
        info!(flight, letter = letter_type, sent, failed, "letters dispatched");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DeliveryError, LetterRecord, Subject};
    use chrono::NaiveDate;
    use std::cell::RefCell;

    struct Herd(Vec<Subject>);

    impl EntityStore for Herd {
        fn has_kind(&self, kind: &str) -> bool {
            kind == "dragons"
        }

        fn count(&self, _scope: &Scope) -> Result<u64, StoreError> {
            Ok(self.0.len() as u64)
        }

        fn find_each(
            &self,
            _scope: &Scope,
            _batch: usize,
        ) -> Box<dyn Iterator<Item = Result<Subject, StoreError>> + '_> {
            Box::new(self.0.iter().cloned().map(Ok))
        }
    }

    #[derive(Default)]
    struct Ledger {
        created: RefCell<Vec<LetterRecord>>,
        sent: RefCell<Vec<i64>>,
    }

    impl RecordStore for Ledger {
        fn create(
            &self,
            subject: &Subject,
            letter_type: &str,
            flight: &str,
            at: NaiveDateTime,
        ) -> Result<LetterRecord, StoreError> {
            let mut created = self.created.borrow_mut();
            let record = LetterRecord {
                id: created.len() as i64 + 1,
                subject_id: subject.id,
                subject_kind: subject.kind.clone(),
                letter_type: letter_type.to_string(),
                flight: flight.to_string(),
                created_at: at,
                sent_at: None,
            };
            created.push(record.clone());
            Ok(record)
        }

        fn mark_sent(&self, record: &LetterRecord, _at: NaiveDateTime) -> Result<(), StoreError> {
            self.sent.borrow_mut().push(record.id);
            Ok(())
        }
    }

    /// Fails delivery for one unlucky subject id.
    struct Unreliable {
        refuses: i64,
    }

    impl LetterSender for Unreliable {
        fn is_deliverable(&self, _letter_type: &str) -> bool {
            true
        }

        fn deliver(
            &self,
            subject: &Subject,
            _letter_type: &str,
            _flight: &str,
        ) -> Result<(), DeliveryError> {
            if subject.id == self.refuses {
                Err("mailbox on fire".into())
            } else {
                Ok(())
            }
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 2, 12).unwrap().and_hms_opt(4, 30, 0).unwrap()
    }

    fn dragon(id: i64) -> Subject {
        Subject { id, kind: "dragons".to_string() }
    }

    #[test]
    fn records_every_subject_and_stamps_only_delivered_ones() {
        let entities = Herd(vec![dragon(1), dragon(2), dragon(3)]);
        let records = Ledger::default();
        let sender = Unreliable { refuses: 2 };

        send_letters(&entities, &records, &sender, "aflight", "welcome", &Scope::all("dragons"), now(), 100)
            .unwrap();

        let created = records.created.borrow();
        assert_eq!(created.len(), 3, "a record per matched subject");
        assert!(created.iter().all(|r| r.letter_type == "welcome" && r.flight == "aflight"));
        assert!(created.iter().all(|r| r.created_at == now()));

        // Subject 2's delivery failed; its record stays unstamped.
        assert_eq!(*records.sent.borrow(), [1, 3]);
    }

    #[test]
    fn store_errors_abort_the_batch() {
        struct Broken;

        impl EntityStore for Broken {
            fn has_kind(&self, _kind: &str) -> bool {
                true
            }

            fn count(&self, _scope: &Scope) -> Result<u64, StoreError> {
                Err(StoreError::new("connection lost"))
            }

            fn find_each(
                &self,
                _scope: &Scope,
                _batch: usize,
            ) -> Box<dyn Iterator<Item = Result<Subject, StoreError>> + '_> {
                Box::new(
                    [Ok(Subject { id: 1, kind: "dragons".to_string() }), Err(StoreError::new("connection lost"))]
                        .into_iter(),
                )
            }
        }

        let records = Ledger::default();
        let sender = Unreliable { refuses: 0 };

        let err =
            send_letters(&Broken, &records, &sender, "aflight", "welcome", &Scope::all("dragons"), now(), 100)
                .unwrap_err();
        assert_eq!(err, StoreError::new("connection lost"));
        assert_eq!(records.created.borrow().len(), 1, "the batch stops at the failure");
    }
}
