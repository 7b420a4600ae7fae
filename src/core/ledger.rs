use crate::config::LedgerConfig;
use crate::core::intset::IntSet;
use crate::core::terms::{clamp_range, sort_occurrences, Occurrence, TermFrequency, TermIndex, TermPage};
use crate::core::types::{Record, RecordIndex};
use crate::error::{AnnotatorError, Result};
use crate::persistence::{load_records, save_records};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};
use tracing::{debug, info};

/// Counts of unanswered and answered records, taken at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub todo: usize,
    pub done: usize,
}

impl Statistics {
    pub fn total(&self) -> usize {
        self.todo + self.done
    }
}

/// Wall-clock times of the last accepted answer and the last successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamps {
    pub last_change: Option<SystemTime>,
    pub last_save: Option<SystemTime>,
}

// Everything answer submission mutates.
struct LedgerState {
    records: Vec<Record>,
    todo: IntSet,
    /// Bumped on every accepted answer.
    revision: u64,
    /// Revision captured by the last successful save.
    saved_revision: u64,
    last_change: Option<SystemTime>,
    last_save: Option<SystemTime>,
}

/// Holds a collection of records, some answered, some not yet.
///
/// All answer bookkeeping sits behind one reader/writer lock. Submitting an
/// answer is the only write and never holds the lock across I/O; saves copy
/// the records under the read lock and encode them with no lock held.
/// A separate mutex keeps saves from overlapping each other.
pub struct Ledger {
    state: RwLock<LedgerState>,
    terms: Option<TermIndex>,
    path: Option<PathBuf>,
    save_gate: Mutex<()>,
}

impl Ledger {
    /// Loads the records at `config.path`, or starts empty if there is none.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let records = match &config.path {
            Some(path) => load_records(path)?,
            None => Vec::new(),
        };
        Ok(Self::from_records(records, config))
    }

    pub fn from_records(records: Vec<Record>, config: &LedgerConfig) -> Self {
        let mut todo = IntSet::new(records.len());
        for (i, record) in records.iter().enumerate() {
            if !record.is_answered() {
                todo.add(i);
            }
        }

        let terms = config.index_terms.then(|| TermIndex::build(&records));
        info!(
            records = records.len(),
            unanswered = todo.len(),
            terms = terms.as_ref().map_or(0, TermIndex::len),
            "ledger ready"
        );

        Self {
            state: RwLock::new(LedgerState {
                records,
                todo,
                revision: 0,
                saved_revision: 0,
                last_change: None,
                last_save: None,
            }),
            terms,
            path: config.path.clone(),
            save_gate: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_record(&self, index: RecordIndex) -> Result<Record> {
        let state = self.state.read();
        state
            .records
            .get(index)
            .cloned()
            .ok_or(AnnotatorError::OutOfRange {
                index,
                len: state.records.len(),
            })
    }

    /// Stores `answer` as the golden value of record `index`.
    ///
    /// Returns the number of answered records including this one. Only the
    /// first submission for a record succeeds; later ones get
    /// `AlreadyAnswered` and change nothing.
    pub fn submit_answer(&self, index: RecordIndex, answer: impl Into<String>) -> Result<usize> {
        let answer = answer.into();
        if answer.is_empty() {
            return Err(AnnotatorError::EmptyAnswer { index });
        }

        let mut state = self.state.write();
        let total = state.records.len();
        if index >= total {
            return Err(AnnotatorError::OutOfRange { index, len: total });
        }

        let done = total - state.todo.len();
        if !state.todo.remove(index) {
            return Err(AnnotatorError::AlreadyAnswered { index });
        }
        state.records[index].golden = answer;
        state.revision += 1;
        state.last_change = Some(SystemTime::now());
        drop(state);

        debug!(index, done = done + 1, "answer stored");
        Ok(done + 1)
    }

    /// Picks an unanswered record uniformly at random.
    pub fn pick_unanswered(&self) -> Result<RecordIndex> {
        let state = self.state.read();
        let todo = state.todo.len();
        if todo == 0 {
            return Err(AnnotatorError::NothingToDo);
        }
        let k = rand::thread_rng().gen_range(0..todo);
        state.todo.at(k).ok_or(AnnotatorError::NothingToDo)
    }

    pub fn statistics(&self) -> Statistics {
        let state = self.state.read();
        let todo = state.todo.len();
        Statistics {
            todo,
            done: state.records.len() - todo,
        }
    }

    /// Copies every record, answered or not.
    pub fn dump(&self) -> Vec<Record> {
        self.state.read().records.clone()
    }

    pub fn timestamps(&self) -> Timestamps {
        let state = self.state.read();
        Timestamps {
            last_change: state.last_change,
            last_save: state.last_save,
        }
    }

    /// Reports whether answers arrived since the last successful save.
    ///
    /// Never waits for an in-flight save.
    pub fn is_dirty(&self) -> bool {
        let state = self.state.read();
        state.revision > state.saved_revision
    }

    /// Writes all records to the ledger's path. A ledger without a path has
    /// nothing to save and succeeds.
    pub fn save(&self) -> Result<()> {
        let _gate = self.save_gate.lock();
        self.save_gated()
    }

    /// Saves only if answers arrived since the last save. Reports whether it saved.
    pub fn save_if_dirty(&self) -> Result<bool> {
        let _gate = self.save_gate.lock();
        if self.path.is_none() || !self.is_dirty() {
            return Ok(false);
        }
        self.save_gated()?;
        Ok(true)
    }

    // Caller holds `save_gate`.
    fn save_gated(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let (records, revision) = {
            let state = self.state.read();
            (state.records.clone(), state.revision)
        };

        let started = Instant::now();
        info!(path = %path.display(), records = records.len(), "saving");
        save_records(path, &records)?;

        {
            let mut state = self.state.write();
            state.saved_revision = revision;
            state.last_save = Some(SystemTime::now());
        }
        info!(
            path = %path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "saved"
        );
        Ok(())
    }

    /// Returns the page `[from, from + size)` of terms ranked by frequency.
    pub fn list_terms(&self, from: usize, size: usize) -> Result<Vec<TermFrequency>> {
        let terms = self.terms.as_ref().ok_or(AnnotatorError::TermIndexDisabled)?;
        Ok(terms.list_terms(from, size))
    }

    /// Returns the page `[from, from + size)` of records whose input is `term`,
    /// restricted records first.
    pub fn lookup_term(&self, term: &str, from: usize, size: usize) -> Result<TermPage> {
        let terms = self.terms.as_ref().ok_or(AnnotatorError::TermIndexDisabled)?;
        let hits = terms.occurrences(term).ok_or_else(|| AnnotatorError::NotFound {
            term: term.to_string(),
        })?;

        let mut occurrences: Vec<Occurrence> = {
            let state = self.state.read();
            hits.iter()
                .map(|&index| {
                    let record = &state.records[index];
                    Occurrence {
                        index,
                        source_id: record.id.clone(),
                        restricted: record.restricted,
                        answered: !state.todo.contains(index),
                    }
                })
                .collect()
        };
        sort_occurrences(&mut occurrences);

        let total = occurrences.len();
        let restricted_total = occurrences.iter().filter(|o| o.restricted).count();
        let (start, upto) = clamp_range(from, size, total);
        occurrences.truncate(upto);
        occurrences.drain(..start);

        Ok(TermPage {
            term: term.to_string(),
            from,
            size,
            total,
            restricted_total,
            occurrences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NO_CORRECT_CANDIDATE;

    fn ledger(inputs: &[&str]) -> Ledger {
        let records = inputs.iter().map(|&input| Record::new(input)).collect();
        Ledger::from_records(records, &LedgerConfig::default())
    }

    #[test]
    fn second_submission_is_rejected() {
        let ledger = ledger(&["a", "b", "c"]);
        assert_eq!(ledger.submit_answer(1, "x").unwrap(), 1);
        assert!(matches!(
            ledger.submit_answer(1, "y"),
            Err(AnnotatorError::AlreadyAnswered { index: 1 })
        ));
        assert_eq!(ledger.get_record(1).unwrap().golden, "x");
        assert_eq!(ledger.statistics(), Statistics { todo: 2, done: 1 });
        assert_eq!(ledger.submit_answer(0, NO_CORRECT_CANDIDATE).unwrap(), 2);
    }

    #[test]
    fn rejects_bad_indices_and_empty_answers() {
        let ledger = ledger(&["a"]);
        assert!(matches!(
            ledger.get_record(1),
            Err(AnnotatorError::OutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            ledger.submit_answer(5, "x"),
            Err(AnnotatorError::OutOfRange { index: 5, len: 1 })
        ));
        assert!(matches!(
            ledger.submit_answer(0, ""),
            Err(AnnotatorError::EmptyAnswer { index: 0 })
        ));
        assert_eq!(ledger.statistics().todo, 1);
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn preanswered_records_are_not_todo() {
        let mut records = vec![Record::new("a"), Record::new("b")];
        records[0].golden = "q1".to_string();
        let ledger = Ledger::from_records(records, &LedgerConfig::default());

        assert_eq!(ledger.statistics(), Statistics { todo: 1, done: 1 });
        assert_eq!(ledger.pick_unanswered().unwrap(), 1);
        assert!(matches!(
            ledger.submit_answer(0, "q2"),
            Err(AnnotatorError::AlreadyAnswered { .. })
        ));
    }

    #[test]
    fn pick_draws_only_unanswered() {
        let ledger = ledger(&["a", "b", "c", "d"]);
        ledger.submit_answer(0, "x").unwrap();
        ledger.submit_answer(2, "x").unwrap();
        for _ in 0..50 {
            let i = ledger.pick_unanswered().unwrap();
            assert!(i == 1 || i == 3, "picked answered record {i}");
        }

        ledger.submit_answer(1, "x").unwrap();
        ledger.submit_answer(3, "x").unwrap();
        assert!(matches!(ledger.pick_unanswered(), Err(AnnotatorError::NothingToDo)));
    }

    #[test]
    fn lookup_reflects_live_answers() {
        let mut records: Vec<Record> = ["Foo", "Bar", "Foo", "Foo"].iter().map(|&s| Record::new(s)).collect();
        records[3].restricted = true;
        records[3].id = Some("src-3".to_string());
        let ledger = Ledger::from_records(records, &LedgerConfig::default());

        let page = ledger.lookup_term("Foo", 0, 10).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.restricted_total, 1);
        let order: Vec<_> = page.occurrences.iter().map(|o| o.index).collect();
        assert_eq!(order, [3, 0, 2]);
        assert_eq!(page.occurrences[0].source_id.as_deref(), Some("src-3"));
        assert!(page.occurrences.iter().all(|o| !o.answered));

        ledger.submit_answer(2, "x").unwrap();
        let page = ledger.lookup_term("Foo", 1, 1).unwrap();
        assert_eq!(page.occurrences.len(), 1);
        assert_eq!(page.occurrences[0].index, 0);
        let page = ledger.lookup_term("Foo", 2, 5).unwrap();
        assert!(page.occurrences[0].answered);
        assert!(ledger.lookup_term("Foo", 9, 5).unwrap().occurrences.is_empty());

        assert!(matches!(
            ledger.lookup_term("Baz", 0, 10),
            Err(AnnotatorError::NotFound { .. })
        ));
    }

    #[test]
    fn term_operations_need_an_index() {
        let config = LedgerConfig::default().with_term_index(false);
        let ledger = Ledger::from_records(vec![Record::new("a")], &config);
        assert!(matches!(ledger.list_terms(0, 10), Err(AnnotatorError::TermIndexDisabled)));
        assert!(matches!(
            ledger.lookup_term("a", 0, 10),
            Err(AnnotatorError::TermIndexDisabled)
        ));
    }

    #[test]
    fn in_memory_ledger_has_nothing_to_save() {
        let ledger = ledger(&["a"]);
        ledger.submit_answer(0, "x").unwrap();
        assert!(ledger.is_dirty());
        ledger.save().unwrap();
        assert!(!ledger.save_if_dirty().unwrap());

        let stamps = ledger.timestamps();
        assert!(stamps.last_change.is_some());
        assert_eq!(stamps.last_save, None);
    }

    #[test]
    fn dirty_check_does_not_wait_for_saves() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let ledger = ledger(&["a", "b"]);
        ledger.submit_answer(0, "x").unwrap();

        let (tx, rx) = mpsc::channel();
        let ledger = &ledger;
        thread::scope(|s| {
            // Stand in for a save stuck on slow disk.
            let gate = ledger.save_gate.lock();
            s.spawn(move || {
                let _ = tx.send((ledger.is_dirty(), ledger.timestamps().last_change.is_some()));
            });
            let seen = rx.recv_timeout(Duration::from_secs(10));
            drop(gate);
            assert_eq!(seen, Ok((true, true)));
        });
    }

    #[test]
    fn periodic_policy_saves_only_new_answers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let config = LedgerConfig::new(&path);
        let ledger = Ledger::from_records(vec![Record::new("a"), Record::new("b")], &config);

        assert!(!ledger.save_if_dirty().unwrap());
        assert!(!path.exists());

        ledger.submit_answer(1, "x").unwrap();
        assert!(ledger.save_if_dirty().unwrap());
        assert!(!ledger.is_dirty());
        assert!(!ledger.save_if_dirty().unwrap());
        assert!(ledger.timestamps().last_save.is_some());

        let reloaded = Ledger::open(&config).unwrap();
        assert_eq!(reloaded.statistics(), Statistics { todo: 1, done: 1 });
        assert_eq!(reloaded.get_record(1).unwrap().golden, "x");
    }
}
