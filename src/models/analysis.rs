use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Period an analysis request aggregates over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnalysisWindow {
    #[default]
    LastMonth,
    Last6Months,
    Last12Months,
}

impl AnalysisWindow {
    /// Parse the `filter` query value; unknown or missing values mean last month.
    pub fn from_filter(filter: Option<&str>) -> Self {
        match filter.map(str::trim) {
            Some("Last 6 Months") => AnalysisWindow::Last6Months,
            Some("Last 12 Months") => AnalysisWindow::Last12Months,
            _ => AnalysisWindow::LastMonth,
        }
    }

    /// Resolve the window against `today`.
    ///
    /// `LastMonth` is the whole previous calendar month and never includes
    /// the current month. The rolling windows run from the same day N months
    /// ago up to and including today.
    pub fn bounds(&self, today: NaiveDate) -> DateWindow {
        match self {
            AnalysisWindow::LastMonth => {
                let first_of_month = today - Days::new(u64::from(today.day0()));
                let start = first_of_month
                    .checked_sub_months(Months::new(1))
                    .unwrap_or(NaiveDate::MIN);
                let end = start
                    .checked_add_months(Months::new(1))
                    .unwrap_or(NaiveDate::MAX);
                DateWindow { start, end }
            }
            AnalysisWindow::Last6Months => Self::rolling(today, 6),
            AnalysisWindow::Last12Months => Self::rolling(today, 12),
        }
    }

    fn rolling(today: NaiveDate, months: u32) -> DateWindow {
        DateWindow {
            start: today
                .checked_sub_months(Months::new(months))
                .unwrap_or(NaiveDate::MIN),
            end: today.succ_opt().unwrap_or(NaiveDate::MAX),
        }
    }
}

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Query parameters for the analysis endpoint
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalysisQuery {
    /// One of "Last Month", "Last 6 Months", "Last 12 Months"
    pub filter: Option<String>,
}

/// Per-day spend inside a window, with the limit check applied
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSummary {
    pub window: DateWindow,
    pub daily_totals: Vec<(NaiveDate, Decimal)>,
    pub total: Decimal,
    pub limit_exceeded: bool,
}

/// Chart payload returned by `GET /api/budget/analysis`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAnalysis {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    pub is_limit_exceeded: bool,
}

impl From<BudgetSummary> for BudgetAnalysis {
    fn from(summary: BudgetSummary) -> Self {
        let (labels, data) = summary
            .daily_totals
            .iter()
            .map(|(date, total)| {
                (
                    date.format("%Y-%m-%d").to_string(),
                    total.to_f64().unwrap_or_default(),
                )
            })
            .unzip();

        Self {
            labels,
            data,
            is_limit_exceeded: summary.limit_exceeded,
        }
    }
}
