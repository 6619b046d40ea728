// src/common/clock.rs

use chrono::{DateTime, Months, NaiveDate, Utc};
use chrono_tz::Tz;

/// Fonte de tempo injetada nos serviços. "Hoje" é sempre a data civil no
/// fuso horário do negócio, nunca a data UTC.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn timezone(&self) -> Tz;

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.timezone()).date_naive()
    }
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Soma meses respeitando o fim do mês (31/01 + 1 mês = 28/02 ou 29/02).
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}

pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Relógio parado para os testes, com avanço manual.
    pub struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        pub fn at(now: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(now) }
        }

        /// Meio-dia UTC evita que o fuso do negócio mude a data civil.
        pub fn on(date: NaiveDate) -> Self {
            Self::at(date.and_hms_opt(12, 0, 0).unwrap().and_utc())
        }

        pub fn advance_days(&self, days: i64) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::days(days);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        fn timezone(&self) -> Tz {
            chrono_tz::America::Argentina::Buenos_Aires
        }
    }
}
