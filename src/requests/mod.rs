//! Settlement workflows for payment (buy tokens) and withdrawal (cash out)
//! requests. Both follow the same shape: a player submits, an admin makes
//! exactly one terminal decision.

pub mod payments;
pub mod withdrawals;

pub use payments::PaymentManager;
pub use withdrawals::{withdrawal_fee, WithdrawalManager};

use serde::Deserialize;

/// Terminal outcome of an admin review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_status(&self) -> &'static str {
        match self {
            Decision::Approve => "approved",
            Decision::Reject => "rejected",
        }
    }
}
