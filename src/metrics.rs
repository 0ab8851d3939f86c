//! Values derived from stored fields. Never persisted; always recomputed.

use crate::model::{Enrolment, Exam};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Days between completion and deadline: positive when early, negative when
/// late, `None` until the enrolment is completed.
pub fn extra_time(deadline: NaiveDate, completion_date: Option<NaiveDate>) -> Option<i64> {
    completion_date.map(|done| (deadline - done).num_days())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeliness {
    Early(i64),
    Late(i64),
    OnTime,
    NotCompleted,
}

impl Timeliness {
    pub fn from_extra_time(extra: Option<i64>) -> Self {
        match extra {
            None => Timeliness::NotCompleted,
            Some(0) => Timeliness::OnTime,
            Some(d) if d > 0 => Timeliness::Early(d),
            Some(d) => Timeliness::Late(-d),
        }
    }
}

impl fmt::Display for Timeliness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn days(n: i64) -> &'static str {
            if n == 1 {
                "day"
            } else {
                "days"
            }
        }
        match *self {
            Timeliness::Early(n) => write!(f, "{} {} early", n, days(n)),
            Timeliness::Late(n) => write!(f, "{} {} late", n, days(n)),
            Timeliness::OnTime => f.write_str("On time"),
            Timeliness::NotCompleted => f.write_str("Not completed yet"),
        }
    }
}

/// `obtained / total * 100` to two decimals, rounded half away from zero.
/// Zero whenever the ratio is undefined.
pub fn percentage(total: Option<Decimal>, obtained: Option<Decimal>) -> Decimal {
    let (Some(total), Some(obtained)) = (total, obtained) else {
        return Decimal::ZERO;
    };
    if total <= Decimal::ZERO || obtained <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let Some(ratio) = obtained
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(total))
    else {
        return Decimal::ZERO;
    };
    let mut p = ratio.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    p.rescale(2);
    p
}

pub fn result_in_percentage(total: Option<Decimal>, obtained: Option<Decimal>) -> f64 {
    percentage(total, obtained).to_f64().unwrap_or(0.0)
}

pub fn percentage_display(total: Option<Decimal>, obtained: Option<Decimal>) -> String {
    format!("{}%", percentage(total, obtained))
}

impl Enrolment {
    pub fn extra_time(&self) -> Option<i64> {
        extra_time(self.deadline, self.completion_date)
    }

    pub fn timeliness(&self) -> Timeliness {
        Timeliness::from_extra_time(self.extra_time())
    }
}

impl Exam {
    pub fn result_in_percentage(&self) -> f64 {
        result_in_percentage(Some(self.total_marks), Some(self.obtained_marks))
    }

    pub fn result_display(&self) -> String {
        percentage_display(Some(self.total_marks), Some(self.obtained_marks))
    }
}
