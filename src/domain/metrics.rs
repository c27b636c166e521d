//! Trade statistics over a run's closed trades.

use crate::domain::trade::TradeRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub profit_factor: f64,
    /// Mean P&L of winning trades.
    pub avg_win: f64,
    /// Mean magnitude of losing trades' P&L.
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Mean holding time in minutes.
    pub avg_holding_minutes: f64,
}

impl TradeStats {
    /// Breakeven trades count as losses, matching [`crate::domain::trade::Outcome`].
    pub fn compute(trades: &[TradeRecord]) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut holding_minutes = 0i64;

        for trade in trades {
            let pnl = trade.pnl;
            if trade.is_win() {
                wins += 1;
                total_wins += pnl;
                if pnl > largest_win {
                    largest_win = pnl;
                }
            } else {
                losses += 1;
                total_losses += pnl.abs();
                if pnl.abs() > largest_loss {
                    largest_loss = pnl.abs();
                }
            }
            holding_minutes += (trade.exit_time - trade.entry_time).num_minutes();
        }

        let count = trades.len();
        let win_rate = if count > 0 {
            wins as f64 / count as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if wins > 0 {
            total_wins / wins as f64
        } else {
            0.0
        };

        let avg_loss = if losses > 0 {
            total_losses / losses as f64
        } else {
            0.0
        };

        let avg_holding_minutes = if count > 0 {
            holding_minutes as f64 / count as f64
        } else {
            0.0
        };

        TradeStats {
            trades: count,
            wins,
            losses,
            win_rate,
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_holding_minutes,
        }
    }
}
