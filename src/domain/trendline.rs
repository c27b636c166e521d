//! Best-fit trendline through a pivot sequence.
//!
//! Pivots are sorted by price and the extreme one anchors every candidate
//! line. Each candidate (anchor, pivot) is scored by how many pivots of the
//! whole set lie within `margin_of_error * line(index)` of the line.

use crate::domain::error::SwingtraderError;
use crate::domain::pivot::Pivot;

pub const DEFAULT_MARGIN_OF_ERROR: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Trendline {
    pub start: Pivot,
    pub end: Pivot,
    pub pivots: Vec<Pivot>,
    pub slope: f64,
    pub intercept: f64,
    pub margin_of_error: f64,
    pub score: usize,
}

impl Trendline {
    /// Line through `start` and `end` in (index, price) space, scored against `pivots`.
    ///
    /// Returns `None` when both pivots share an index.
    pub fn through(
        start: Pivot,
        end: Pivot,
        pivots: &[Pivot],
        margin_of_error: f64,
    ) -> Option<Self> {
        let line = Line::through(&start, &end)?;
        Some(Trendline {
            start,
            end,
            pivots: pivots.to_vec(),
            slope: line.slope,
            intercept: line.intercept,
            margin_of_error,
            score: line.score(pivots, margin_of_error),
        })
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.line().value_at(index)
    }

    /// |line(p) - p| < margin * line(p)
    pub fn touches(&self, pivot: &Pivot) -> bool {
        self.line().touches(pivot, self.margin_of_error)
    }

    fn line(&self) -> Line {
        Line {
            slope: self.slope,
            intercept: self.intercept,
        }
    }
}

/// Bare line geometry, scored without copying the pivot set.
#[derive(Debug, Clone, Copy)]
struct Line {
    slope: f64,
    intercept: f64,
}

impl Line {
    fn through(start: &Pivot, end: &Pivot) -> Option<Self> {
        if start.index == end.index {
            return None;
        }
        let slope = (end.price - start.price) / (end.index as f64 - start.index as f64);
        Some(Line {
            slope,
            intercept: start.price - slope * start.index as f64,
        })
    }

    fn value_at(&self, index: usize) -> f64 {
        self.intercept + self.slope * index as f64
    }

    fn touches(&self, pivot: &Pivot, margin_of_error: f64) -> bool {
        let expected = self.value_at(pivot.index);
        (expected - pivot.price).abs() < expected * margin_of_error
    }

    fn score(&self, pivots: &[Pivot], margin_of_error: f64) -> usize {
        pivots
            .iter()
            .filter(|p| self.touches(p, margin_of_error))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendlineFitter {
    pub margin_of_error: f64,
    /// Sort descending (favours resistance lines) instead of ascending.
    pub reverse: bool,
}

impl Default for TrendlineFitter {
    fn default() -> Self {
        TrendlineFitter {
            margin_of_error: DEFAULT_MARGIN_OF_ERROR,
            reverse: false,
        }
    }
}

impl TrendlineFitter {
    pub fn new(margin_of_error: f64, reverse: bool) -> Self {
        TrendlineFitter {
            margin_of_error,
            reverse,
        }
    }

    /// Highest-scoring line anchored at the extreme pivot.
    ///
    /// Candidates earlier than the current best end pivot are skipped; ties
    /// keep the earlier candidate in sort order. `Ok(None)` when no candidate
    /// is eligible.
    pub fn fit(&self, pivots: &[Pivot]) -> Result<Option<Trendline>, SwingtraderError> {
        if pivots.len() < 2 {
            return Err(SwingtraderError::InsufficientPivots {
                found: pivots.len(),
            });
        }

        let mut sorted = pivots.to_vec();
        if self.reverse {
            sorted.sort_by(|a, b| b.price.total_cmp(&a.price));
        } else {
            sorted.sort_by(|a, b| a.price.total_cmp(&b.price));
        }

        let anchor = sorted[0];
        let mut not_before = anchor.timestamp;
        let mut best: Option<(Pivot, usize)> = None;

        for candidate in &sorted[1..] {
            if candidate.timestamp < not_before {
                continue;
            }
            let Some(line) = Line::through(&anchor, candidate) else {
                continue;
            };
            let score = line.score(&sorted, self.margin_of_error);
            if score > best.map_or(0, |(_, s)| s) {
                not_before = candidate.timestamp;
                best = Some((*candidate, score));
            }
        }

        Ok(best.and_then(|(end, _)| {
            Trendline::through(anchor, end, &sorted, self.margin_of_error)
        }))
    }
}
