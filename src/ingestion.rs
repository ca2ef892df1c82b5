use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::domain::traits::CommandStream;
use crate::domain::{Command, CommandKind, Error, Money, ResourceId};

pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Self {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Self { reader: Some(rdr) }
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    op: String,
    account: String,
    resource: Option<String>,
    amount: Option<Money>,
}

fn resource(row: &CsvRow) -> Result<ResourceId, Error> {
    let raw = row
        .resource
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| Error::Ingestion(format!("{} requires a resource id", row.op)))?;
    raw.parse()
        .map_err(|e| Error::Ingestion(format!("Invalid resource id {}: {}", raw, e)))
}

impl TryFrom<CsvRow> for Command {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        if row.account.is_empty() {
            return Err(Error::Ingestion(format!("{} is missing an account", row.op)));
        }

        let op = row.op.to_ascii_lowercase();
        let kind = match (op.as_str(), row.amount) {
            ("deposit", Some(amount)) => CommandKind::Deposit { amount },
            ("deposit", None) => {
                return Err(Error::Ingestion("deposit requires an amount".to_string()));
            }
            (other, Some(_)) => {
                return Err(Error::Ingestion(format!("{} does not take an amount", other)));
            }
            ("register", None) => CommandKind::Register,
            ("add", None) => CommandKind::AddToCart {
                resource_id: resource(&row)?,
            },
            ("remove", None) => CommandKind::RemoveFromCart {
                resource_id: resource(&row)?,
            },
            ("clear", None) => CommandKind::ClearCart,
            ("purchase", None) => CommandKind::Purchase,
            ("activate", None) => CommandKind::Activate,
            ("deactivate", None) => CommandKind::Deactivate,
            (other, None) => {
                return Err(Error::Ingestion(format!("Invalid command: {}", other)));
            }
        };

        Ok(Command {
            kind,
            username: row.account,
        })
    }
}

impl<R: Read + Send + 'static> CommandStream for CsvReader<R> {
    type CmdStream = Pin<Box<dyn Stream<Item = Result<Command, Error>> + Send>>;

    fn stream(&mut self) -> Self::CmdStream {
        let reader = match self.reader.take() {
            Some(r) => r,
            None => {
                // Already consumed; return an empty stream.
                return Box::pin(stream::iter(Vec::<Result<Command, Error>>::new()));
            }
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => Command::try_from(row),
                Err(e) => Err(Error::Ingestion(format!(
                    "CSV deserialization error: {}",
                    e
                ))),
            });

        Box::pin(stream::iter(iter))
    }
}
