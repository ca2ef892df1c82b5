use crate::domain::{Money, ResourceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Register,
    Deposit { amount: Money },
    AddToCart { resource_id: ResourceId },
    RemoveFromCart { resource_id: ResourceId },
    ClearCart,
    Purchase,
    Activate,
    Deactivate,
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Register => "register",
            CommandKind::Deposit { .. } => "deposit",
            CommandKind::AddToCart { .. } => "add",
            CommandKind::RemoveFromCart { .. } => "remove",
            CommandKind::ClearCart => "clear",
            CommandKind::Purchase => "purchase",
            CommandKind::Activate => "activate",
            CommandKind::Deactivate => "deactivate",
        }
    }
}

/// One line of a batch fed to the engine. Accounts are named by username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub username: String,
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            CommandKind::Deposit { amount } => {
                write!(f, "deposit,account={},amount={}", self.username, amount)
            }
            CommandKind::AddToCart { resource_id } | CommandKind::RemoveFromCart { resource_id } => {
                write!(
                    f,
                    "{},account={},resource={}",
                    self.kind.name(),
                    self.username,
                    resource_id
                )
            }
            kind => write!(f, "{},account={}", kind.name(), self.username),
        }
    }
}
