//! Trade records and position sizing.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    /// Win only when the exit is strictly above the entry.
    pub fn classify(entry_price: f64, exit_price: f64) -> Self {
        if exit_price - entry_price > 0.0 {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "Win"),
            Outcome::Loss => write!(f, "Loss"),
        }
    }
}

/// How many shares an entry buys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionSizing {
    Shares(u64),
    Money(f64),
}

impl PositionSizing {
    /// Fixed count, or floor(money / price).
    pub fn shares_for(&self, price: f64) -> u64 {
        match *self {
            PositionSizing::Shares(count) => count,
            PositionSizing::Money(amount) => {
                if price > 0.0 && amount > 0.0 {
                    (amount / price).floor() as u64
                } else {
                    0
                }
            }
        }
    }

    /// A non-zero share count wins over the money amount.
    pub fn from_config(money_to_spend: f64, share_count: u64) -> Self {
        if share_count > 0 {
            PositionSizing::Shares(share_count)
        } else {
            PositionSizing::Money(money_to_spend)
        }
    }
}

impl Default for PositionSizing {
    fn default() -> Self {
        PositionSizing::Money(10_000.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u64,
    pub pnl: f64,
    pub outcome: Outcome,
}

impl TradeRecord {
    pub fn close(
        entry_time: NaiveDateTime,
        entry_price: f64,
        shares: u64,
        exit_time: NaiveDateTime,
        exit_price: f64,
    ) -> Self {
        TradeRecord {
            entry_time,
            exit_time,
            entry_price,
            exit_price,
            shares,
            pnl: (exit_price - entry_price) * shares as f64,
            outcome: Outcome::classify(entry_price, exit_price),
        }
    }

    pub fn is_win(&self) -> bool {
        self.outcome == Outcome::Win
    }
}
