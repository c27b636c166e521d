//! Report output port.

use crate::domain::dip_and_rip::DipAndRipTrade;
use crate::domain::error::SwingtraderError;
use crate::domain::ma_proximity::MaSetup;
use crate::domain::pivot::Pivot;
use crate::domain::trade::TradeRecord;
use std::path::Path;

/// Trades from one instrument's run.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeTrades {
    pub code: String,
    pub trades: Vec<TradeRecord>,
}

pub trait ReportPort {
    fn write_pivots(&self, pivots: &[Pivot], output_path: &Path) -> Result<(), SwingtraderError>;

    fn write_trades(
        &self,
        runs: &[CodeTrades],
        output_path: &Path,
    ) -> Result<(), SwingtraderError>;

    fn write_setups(&self, setups: &[MaSetup], output_path: &Path)
    -> Result<(), SwingtraderError>;

    fn write_dip_and_rip(
        &self,
        trades: &[DipAndRipTrade],
        output_path: &Path,
    ) -> Result<(), SwingtraderError>;
}
