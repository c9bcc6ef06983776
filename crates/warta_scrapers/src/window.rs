use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Closed sub-range of a query range handed to one extractor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl std::fmt::Display for ExtractionWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}..{}", self.from, self.to)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// One window per calendar day, oldest first.
    Daily,
    /// The whole range as a single window.
    #[default]
    Whole,
}

#[derive(Debug, Clone)]
pub struct DateWindows {
    next: Option<NaiveDate>,
    to: NaiveDate,
    mode: WindowMode,
}

impl DateWindows {
    pub fn new(from: NaiveDate, to: NaiveDate, mode: WindowMode) -> Self {
        Self {
            next: (from <= to).then_some(from),
            to,
            mode,
        }
    }
}

impl Iterator for DateWindows {
    type Item = ExtractionWindow;

    fn next(&mut self) -> Option<Self::Item> {
        let from = self.next?;
        let window = match self.mode {
            WindowMode::Daily => ExtractionWindow { from, to: from },
            WindowMode::Whole => ExtractionWindow { from, to: self.to },
        };
        self.next = window
            .to
            .checked_add_days(Days::new(1))
            .filter(|day| *day <= self.to);
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match (self.next, self.mode) {
            (None, _) => 0,
            (Some(_), WindowMode::Whole) => 1,
            (Some(from), WindowMode::Daily) => ((self.to - from).num_days() + 1) as usize,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DateWindows {}
