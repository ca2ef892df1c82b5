use std::io::Write;

use serde::Serialize;

use crate::domain::{Account, EntryKind, EntryStatus, Error, LedgerEntry, Money, OwnerDirectory};

#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    username: &'a str,
    balance: Money,
    owned: usize,
    active: bool,
}

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    id: String,
    owner: &'a str,
    #[serde(rename = "type")]
    kind: EntryKind,
    status: EntryStatus,
    amount: Money,
    created_at: String,
}

fn csv_error(e: csv::Error) -> Error {
    Error::IO(std::io::Error::other(e))
}

pub fn write_accounts<W: Write>(accounts: &[Account], out: W) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(out);
    for account in accounts {
        writer
            .serialize(AccountRow {
                username: &account.username,
                balance: account.balance,
                owned: account.owned.len(),
                active: account.active,
            })
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_ledger<W: Write>(
    entries: &[LedgerEntry],
    owners: &dyn OwnerDirectory,
    out: W,
) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in entries {
        let owner = owners.display_name(entry.owner_id).unwrap_or_default();
        writer
            .serialize(LedgerRow {
                id: entry.id.to_string(),
                owner: &owner,
                kind: entry.kind,
                status: entry.status,
                amount: entry.amount,
                created_at: entry.created_at.to_rfc3339(),
            })
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;

    struct FixedName;

    impl OwnerDirectory for FixedName {
        fn display_name(&self, _: AccountId) -> Option<String> {
            Some("alice".to_string())
        }
    }

    #[test]
    fn writes_headers_and_rows() {
        let mut account = Account::new("alice");
        account.credit(Money::from_cents(1_050)).unwrap();

        let mut out = Vec::new();
        write_accounts(&[account.clone()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "username,balance,owned,active\nalice,10.50,0,true\n");

        let entry = LedgerEntry::failed(account.id, Money::from_cents(1_000), EntryKind::Purchase);
        let mut out = Vec::new();
        write_ledger(&[entry], &FixedName, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("id,owner,type,status,amount,created_at\n"));
        assert!(text.contains(",alice,PURCHASE,FAILED,10.00,"));
    }
}
