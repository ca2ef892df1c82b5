//! Ledger stores.
//!
//! `InMemoryLedger` keeps entries in append order behind a lock.
//! `JournalLedger` additionally writes every entry and account lifecycle
//! event to an append-only journal, one JSON record per line, before it
//! becomes visible. A failed write is cut back off the file, so nothing of
//! it is replayed later.

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::{AccountEvent, AccountId, EntryId, Error, Ledger, LedgerEntry};

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    fn collect<F>(&self, filter: F) -> Result<Vec<LedgerEntry>, Error>
    where
        F: Fn(&LedgerEntry) -> bool,
    {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Persistence("ledger lock poisoned".to_string()))?;

        // Reverse append order first so the stable sort keeps later appends
        // ahead of earlier ones on equal timestamps.
        let mut selected: Vec<LedgerEntry> =
            entries.iter().rev().filter(|e| filter(e)).cloned().collect();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(selected)
    }
}

impl Ledger for InMemoryLedger {
    fn append(&self, entry: LedgerEntry) -> Result<EntryId, Error> {
        let id = entry.id;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Persistence("ledger lock poisoned".to_string()))?;
        entries.push(entry);
        Ok(id)
    }

    fn list_for_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, Error> {
        self.collect(|entry| entry.owner_id == account_id)
    }

    fn list_all(&self) -> Result<Vec<LedgerEntry>, Error> {
        self.collect(|_| true)
    }
}

/// Byte sink under a journal. Writes always land at the current end.
pub trait JournalSink: Write + Send {
    /// Current end offset.
    fn end(&self) -> io::Result<u64>;

    fn truncate(&mut self, end: u64) -> io::Result<()>;

    /// Makes everything written so far durable.
    fn sync(&mut self) -> io::Result<()>;
}

impl JournalSink for File {
    fn end(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, end: u64) -> io::Result<()> {
        self.set_len(end)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum JournalLine<'a> {
    Account(&'a AccountEvent),
    Entry(&'a LedgerEntry),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum JournalRecord {
    Account(AccountEvent),
    Entry(LedgerEntry),
}

fn journal_error(e: impl Display) -> Error {
    Error::Persistence(format!("ledger journal: {}", e))
}

struct JournalWriter<S> {
    sink: S,
    // A failed write could not be cut off; the tail of the sink is unknown.
    broken: bool,
}

impl<S: JournalSink> JournalWriter<S> {
    fn write_line(&mut self, line: &JournalLine<'_>) -> Result<(), Error> {
        if self.broken {
            return Err(journal_error("unusable after a failed rollback"));
        }

        let mut bytes = serde_json::to_vec(line).map_err(journal_error)?;
        bytes.push(b'\n');

        let end = self.sink.end().map_err(journal_error)?;
        let written = self
            .sink
            .write_all(&bytes)
            .and_then(|()| self.sink.flush())
            .and_then(|()| self.sink.sync());

        if let Err(e) = written {
            if let Err(undo) = self.sink.truncate(end) {
                self.broken = true;
                error!(end, error = %undo, "Ledger journal rollback failed, refusing further writes");
            }
            return Err(journal_error(e));
        }
        Ok(())
    }
}

pub struct JournalLedger<S = File> {
    writer: Mutex<JournalWriter<S>>,
    memory: InMemoryLedger,
    accounts: Mutex<Vec<AccountEvent>>,
}

impl JournalLedger<File> {
    /// Opens the journal at `path`, replaying any records already in it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;

        let ledger = Self::replay(file, &content)?;
        info!(path = %path.display(), entries = ledger.memory.len(), "Replayed ledger journal");
        Ok(ledger)
    }
}

impl<S: JournalSink> JournalLedger<S> {
    /// Rebuilds the in-memory view from `content`, the current bytes of
    /// `sink`. An unterminated last line is a write that never completed and
    /// is cut off.
    fn replay(mut sink: S, content: &[u8]) -> Result<Self, Error> {
        let memory = InMemoryLedger::new();
        let mut accounts = Vec::new();
        let mut offset = 0usize;

        for line in content.split_inclusive(|b| *b == b'\n') {
            if line.last() != Some(&b'\n') {
                warn!(offset, dropped = line.len(), "Cutting off torn ledger journal tail");
                sink.truncate(offset as u64).map_err(journal_error)?;
                break;
            }
            offset += line.len();

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<JournalRecord>(line).map_err(journal_error)? {
                JournalRecord::Account(event) => accounts.push(event),
                JournalRecord::Entry(entry) => {
                    memory.append(entry)?;
                }
            }
        }

        Ok(Self {
            writer: Mutex::new(JournalWriter {
                sink,
                broken: false,
            }),
            memory,
            accounts: Mutex::new(accounts),
        })
    }

    fn writer(&self) -> Result<MutexGuard<'_, JournalWriter<S>>, Error> {
        self.writer
            .lock()
            .map_err(|_| Error::Persistence("journal lock poisoned".to_string()))
    }
}

impl<S: JournalSink> Ledger for JournalLedger<S> {
    fn append(&self, entry: LedgerEntry) -> Result<EntryId, Error> {
        let mut writer = self.writer()?;
        writer.write_line(&JournalLine::Entry(&entry))?;
        debug!(entry = %entry, "Journaled ledger entry");

        // Still under the writer lock, so memory order matches file order.
        self.memory.append(entry)
    }

    fn list_for_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, Error> {
        self.memory.list_for_account(account_id)
    }

    fn list_all(&self) -> Result<Vec<LedgerEntry>, Error> {
        self.memory.list_all()
    }

    fn record_account(&self, event: AccountEvent) -> Result<(), Error> {
        let mut writer = self.writer()?;
        writer.write_line(&JournalLine::Account(&event))?;
        debug!(?event, "Journaled account event");

        self.accounts
            .lock()
            .map_err(|_| Error::Persistence("journal lock poisoned".to_string()))?
            .push(event);
        Ok(())
    }

    fn account_events(&self) -> Result<Vec<AccountEvent>, Error> {
        Ok(self
            .accounts
            .lock()
            .map_err(|_| Error::Persistence("journal lock poisoned".to_string()))?
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::domain::{EntryKind, Money, OwnerDirectory};

    struct Names(HashMap<AccountId, String>);

    impl OwnerDirectory for Names {
        fn display_name(&self, account_id: AccountId) -> Option<String> {
            self.0.get(&account_id).cloned()
        }
    }

    fn deposit(owner: AccountId, cents: u32) -> LedgerEntry {
        LedgerEntry::successful(owner, Money::from_cents(cents), EntryKind::Deposit)
    }

    #[test]
    fn lists_newest_first_per_account() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new();
        let bob = AccountId::new();

        let mut old = deposit(alice, 100);
        old.created_at = Utc::now() - Duration::seconds(60);
        ledger.append(old.clone()).unwrap();
        let newer = deposit(alice, 200);
        ledger.append(newer.clone()).unwrap();
        ledger.append(deposit(bob, 300)).unwrap();

        let entries = ledger.list_for_account(alice).unwrap();
        assert_eq!(entries, vec![newer, old]);
        assert_eq!(ledger.list_all().unwrap().len(), 3);
    }

    #[test]
    fn equal_timestamps_keep_latest_append_first() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new();
        let first = deposit(alice, 100);
        let mut second = deposit(alice, 200);
        second.created_at = first.created_at;

        ledger.append(first.clone()).unwrap();
        ledger.append(second.clone()).unwrap();

        assert_eq!(ledger.list_all().unwrap(), vec![second, first]);
    }

    #[test]
    fn search_by_owner_id_entry_id_or_name() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new();
        let bob = AccountId::new();
        let names = Names(HashMap::from([
            (alice, "AliceWonder".to_string()),
            (bob, "bobby".to_string()),
        ]));

        let a = deposit(alice, 100);
        let b = deposit(bob, 200);
        ledger.append(a.clone()).unwrap();
        ledger.append(b.clone()).unwrap();

        assert_eq!(ledger.search(&alice.to_string(), &names).unwrap(), vec![a.clone()]);
        assert_eq!(ledger.search(&b.id.to_string(), &names).unwrap(), vec![b.clone()]);
        assert_eq!(ledger.search("WONDER", &names).unwrap(), vec![a]);
        assert_eq!(ledger.search("B", &names).unwrap().len(), 1);
        assert!(ledger.search(&AccountId::new().to_string(), &names).unwrap().is_empty());
    }

    #[test]
    fn journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let alice = AccountId::new();

        let entry = deposit(alice, 1_234);
        {
            let ledger = JournalLedger::open(&path).unwrap();
            ledger.append(entry.clone()).unwrap();
        }

        let reopened = JournalLedger::open(&path).unwrap();
        assert_eq!(reopened.list_for_account(alice).unwrap(), vec![entry]);

        reopened.append(deposit(alice, 1)).unwrap();
        let again = JournalLedger::open(&path).unwrap();
        assert_eq!(again.list_all().unwrap().len(), 2);
    }

    #[test]
    fn account_events_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let alice = AccountId::new();
        let events = vec![
            AccountEvent::Registered {
                account_id: alice,
                username: "alice".to_string(),
                created_at: Utc::now(),
            },
            AccountEvent::StatusChanged {
                account_id: alice,
                active: false,
            },
        ];

        {
            let ledger = JournalLedger::open(&path).unwrap();
            for event in &events {
                ledger.record_account(event.clone()).unwrap();
            }
            ledger.append(deposit(alice, 500)).unwrap();
        }

        let reopened = JournalLedger::open(&path).unwrap();
        assert_eq!(reopened.account_events().unwrap(), events);
        assert_eq!(reopened.list_all().unwrap().len(), 1);
    }

    #[test]
    fn torn_tail_is_cut_off_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let alice = AccountId::new();
        let entry = deposit(alice, 100);
        {
            let ledger = JournalLedger::open(&path).unwrap();
            ledger.append(entry.clone()).unwrap();
        }
        let intact = std::fs::metadata(&path).unwrap().len();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"entry":{"id":"8c1"#).unwrap();
        drop(file);

        let reopened = JournalLedger::open(&path).unwrap();
        assert_eq!(reopened.list_all().unwrap(), vec![entry]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), intact);

        reopened.append(deposit(alice, 1)).unwrap();
        assert_eq!(JournalLedger::open(&path).unwrap().list_all().unwrap().len(), 2);
    }

    #[test]
    fn corrupt_record_in_the_middle_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        assert!(matches!(
            JournalLedger::open(&path),
            Err(Error::Persistence(_))
        ));
    }

    /// In-memory sink that can fail its next write halfway through.
    #[derive(Default)]
    struct FlakySink {
        bytes: Vec<u8>,
        fail_next_write: bool,
        fail_truncate: bool,
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_next_write {
                self.fail_next_write = false;
                self.bytes.extend_from_slice(&buf[..buf.len() / 2]);
                return Err(io::Error::other("no space left on device"));
            }
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl JournalSink for FlakySink {
        fn end(&self) -> io::Result<u64> {
            Ok(self.bytes.len() as u64)
        }

        fn truncate(&mut self, end: u64) -> io::Result<()> {
            if self.fail_truncate {
                return Err(io::Error::other("read-only file system"));
            }
            self.bytes.truncate(end as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn journaled_ids(ledger: &JournalLedger<FlakySink>) -> Vec<EntryId> {
        let bytes = ledger.writer.lock().unwrap().sink.bytes.clone();
        let replayed = JournalLedger::replay(FlakySink::default(), &bytes).unwrap();
        replayed.list_all().unwrap().iter().map(|e| e.id).collect()
    }

    #[test]
    fn failed_write_never_reaches_the_journal() {
        let ledger = JournalLedger::replay(FlakySink::default(), &[]).unwrap();
        let alice = AccountId::new();

        let kept = deposit(alice, 100);
        ledger.append(kept.clone()).unwrap();

        ledger.writer.lock().unwrap().sink.fail_next_write = true;
        let lost = deposit(alice, 200);
        assert!(matches!(
            ledger.append(lost.clone()),
            Err(Error::Persistence(_))
        ));
        assert_eq!(ledger.list_all().unwrap(), vec![kept.clone()]);

        let next = deposit(alice, 300);
        ledger.append(next.clone()).unwrap();

        let ids = journaled_ids(&ledger);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&kept.id));
        assert!(ids.contains(&next.id));
        assert!(!ids.contains(&lost.id));
    }

    #[test]
    fn journal_refuses_writes_after_failed_rollback() {
        let ledger = JournalLedger::replay(FlakySink::default(), &[]).unwrap();
        let alice = AccountId::new();
        {
            let mut writer = ledger.writer.lock().unwrap();
            writer.sink.fail_next_write = true;
            writer.sink.fail_truncate = true;
        }
        assert!(ledger.append(deposit(alice, 100)).is_err());

        ledger.writer.lock().unwrap().sink.fail_truncate = false;
        assert!(matches!(
            ledger.append(deposit(alice, 200)),
            Err(Error::Persistence(_))
        ));
        assert!(ledger.list_all().unwrap().is_empty());
    }
}
