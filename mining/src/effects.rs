//! Deferred outbound instructions
//!
//! Mining never calls back into the ledger while it is deciding what to do.
//! It queues effects instead, and the contract runs them after the
//! triggering action has finished.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use udao_core::{Asset, Name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Transfer on another ledger, handed back to the host
    ExternalTransfer {
        contract: Name,
        from: Name,
        to: Name,
        quantity: Asset,
        memo: String,
    },
    Issue {
        to: Name,
        quantity: Asset,
        memo: String,
    },
    Transfer {
        from: Name,
        to: Name,
        quantity: Asset,
        memo: String,
    },
}

impl Effect {
    pub fn is_external(&self) -> bool {
        matches!(self, Effect::ExternalTransfer { .. })
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::ExternalTransfer {
                contract,
                from,
                to,
                quantity,
                memo,
            } => write!(f, "{}::transfer {} -> {} {} ({})", contract, from, to, quantity, memo),
            Effect::Issue { to, quantity, memo } => {
                write!(f, "issue {} to {} ({})", quantity, to, memo)
            }
            Effect::Transfer {
                from,
                to,
                quantity,
                memo,
            } => write!(f, "transfer {} -> {} {} ({})", from, to, quantity, memo),
        }
    }
}

/// FIFO queue of effects produced by one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    queue: VecDeque<Effect>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: Effect) {
        self.queue.push_back(effect);
    }

    pub fn pop(&mut self) -> Option<Effect> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.queue.iter()
    }
}
