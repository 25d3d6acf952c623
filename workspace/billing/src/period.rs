use chrono::{Datelike, NaiveDate};

use crate::error::{BillingError, Result};

/// A billing period identified by calendar year and month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(2000..=2100).contains(&year) || !(1..=12).contains(&month) {
            return Err(BillingError::InvalidAmount(format!(
                "invalid billing period {}-{}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// The period immediately before this one.
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // Months 1-12 with day 1 always form a valid date
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    /// Last calendar day of the period.
    pub fn last_day(&self) -> NaiveDate {
        let next_year = self.year + (self.month / 12) as i32;
        let next_month = (self.month % 12) + 1;
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .unwrap()
            .pred_opt()
            .unwrap()
    }

    /// Compact `YYYYMM` form used in document numbers.
    pub fn compact(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
