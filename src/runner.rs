use futures::StreamExt;
use tracing::debug;

use crate::config::DepositLimits;
use crate::dlq::DeadLetter;
use crate::domain::{
    AccountId, Catalog, Command, CommandKind, CommandStream, DeadLetterQueue, Error, Ledger,
    Outcome,
};
use crate::engine::Engine;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub committed: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// Feeds a command stream through the engine, one command at a time.
pub struct Runner<'a, L, C, D>
where
    L: Ledger,
    C: Catalog,
    D: DeadLetterQueue,
{
    engine: &'a Engine<L, C>,
    limits: DepositLimits,
    dlq: D,
}

impl<'a, L, C, D> Runner<'a, L, C, D>
where
    L: Ledger,
    C: Catalog,
    D: DeadLetterQueue,
{
    pub fn new(engine: &'a Engine<L, C>, limits: DepositLimits, dlq: D) -> Self {
        Self {
            engine,
            limits,
            dlq,
        }
    }

    pub fn dlq(&self) -> &D {
        &self.dlq
    }

    pub async fn process<S: CommandStream>(&mut self, source: &mut S) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut commands = source.stream();

        while let Some(command) = commands.next().await {
            summary.processed += 1;
            let command = match command {
                Ok(command) => command,
                Err(error) => {
                    summary.failed += 1;
                    self.dlq.report(&DeadLetter::Failed {
                        command: "<unparsed>".to_string(),
                        error,
                    });
                    continue;
                }
            };

            let label = command.to_string();
            match self.apply(command).await {
                Ok(None) => summary.committed += 1,
                Ok(Some(outcome)) => {
                    if let Some(advisory) = outcome.advisory() {
                        self.dlq.report(&DeadLetter::Advisory {
                            command: label.clone(),
                            advisory: advisory.clone(),
                        });
                    }
                    match outcome {
                        Outcome::Committed { .. } => summary.committed += 1,
                        Outcome::Rejected { reason, .. } => {
                            summary.rejected += 1;
                            self.dlq.report(&DeadLetter::Rejected {
                                command: label,
                                reason,
                            });
                        }
                    }
                }
                Err(error) => {
                    summary.failed += 1;
                    self.dlq.report(&DeadLetter::Failed {
                        command: label,
                        error,
                    });
                }
            }
        }

        debug!(?summary, "Command stream drained");
        summary
    }

    fn account_id(&self, username: &str) -> Result<AccountId, Error> {
        self.engine
            .registry()
            .find_by_username(username)
            .ok_or_else(|| Error::UnknownUsername(username.to_string()))
    }

    async fn apply(&self, command: Command) -> Result<Option<Outcome>, Error> {
        let username = command.username.as_str();
        match command.kind {
            CommandKind::Register => {
                self.engine.register(username).await?;
                Ok(None)
            }
            CommandKind::Deposit { amount } => {
                let account_id = self.account_id(username)?;
                self.limits.check(amount)?;
                self.engine.deposit(account_id, amount).await.map(Some)
            }
            CommandKind::AddToCart { resource_id } => {
                self.engine
                    .add_to_cart(self.account_id(username)?, resource_id)
                    .await?;
                Ok(None)
            }
            CommandKind::RemoveFromCart { resource_id } => {
                self.engine
                    .remove_from_cart(self.account_id(username)?, resource_id)
                    .await?;
                Ok(None)
            }
            CommandKind::ClearCart => {
                self.engine.clear_cart(self.account_id(username)?).await?;
                Ok(None)
            }
            CommandKind::Purchase => self
                .engine
                .purchase(self.account_id(username)?)
                .await
                .map(Some),
            CommandKind::Activate => {
                self.engine.set_active(self.account_id(username)?, true).await?;
                Ok(None)
            }
            CommandKind::Deactivate => {
                self.engine
                    .set_active(self.account_id(username)?, false)
                    .await?;
                Ok(None)
            }
        }
    }
}
