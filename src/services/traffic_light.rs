// src/services/traffic_light.rs

// Cálculo do semáforo e montagem do painel. Funções puras: "hoje" sempre vem de fora.

use chrono::NaiveDate;

use crate::{
    common::clock::days_between,
    models::{
        dashboard::{ObligationDashboard, StatusCounts, TrafficLightCounts},
        obligation::{Obligation, ObligationStatus, ObligationView, TrafficLight},
        tenancy::Organization,
    },
};

/// Janela (em dias) da lista "próximas a vencer" do painel.
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub yellow: i64,
    pub red: i64,
}

impl Thresholds {
    pub fn of(org: &Organization) -> Self {
        Self {
            yellow: i64::from(org.threshold_yellow_days),
            red: i64::from(org.threshold_red_days),
        }
    }
}

/// Regra única de dias inteiros:
/// terminal => Green/0; Overdue ou vencida => Red; até `red` dias => Red;
/// até `yellow` dias => Yellow; depois disso Green.
pub fn calculate_traffic_light(
    due_date: NaiveDate,
    status: ObligationStatus,
    thresholds: Thresholds,
    today: NaiveDate,
) -> (TrafficLight, i64) {
    if status.is_terminal() {
        return (TrafficLight::Green, 0);
    }

    let days = days_between(today, due_date);
    let light = if status == ObligationStatus::Overdue || days < 0 || days <= thresholds.red {
        TrafficLight::Red
    } else if days <= thresholds.yellow {
        TrafficLight::Yellow
    } else {
        TrafficLight::Green
    };
    (light, days)
}

pub fn enrich(obligation: Obligation, thresholds: Thresholds, today: NaiveDate) -> ObligationView {
    let (traffic_light, days_until_due) =
        calculate_traffic_light(obligation.due_date, obligation.status, thresholds, today);
    ObligationView { obligation, traffic_light, days_until_due }
}

pub fn enrich_all(obligations: Vec<Obligation>, thresholds: Thresholds, today: NaiveDate) -> Vec<ObligationView> {
    obligations.into_iter().map(|o| enrich(o, thresholds, today)).collect()
}

pub fn count_statuses(views: &[ObligationView]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for v in views {
        match v.obligation.status {
            ObligationStatus::Pending => counts.pending += 1,
            ObligationStatus::InProgress => counts.in_progress += 1,
            ObligationStatus::Completed => counts.completed += 1,
            ObligationStatus::Overdue => counts.overdue += 1,
            ObligationStatus::NotApplicable => counts.not_applicable += 1,
        }
    }
    counts
}

/// Só obrigações abertas entram nos baldes do semáforo.
pub fn count_lights(views: &[ObligationView]) -> TrafficLightCounts {
    let mut counts = TrafficLightCounts::default();
    for v in views.iter().filter(|v| !v.obligation.status.is_terminal()) {
        match v.traffic_light {
            TrafficLight::Green => counts.green += 1,
            TrafficLight::Yellow => counts.yellow += 1,
            TrafficLight::Red => counts.red += 1,
        }
    }
    counts
}

pub fn build_dashboard(views: Vec<ObligationView>) -> ObligationDashboard {
    let statuses = count_statuses(&views);
    let traffic_light = count_lights(&views);

    let open = || views.iter().filter(|v| !v.obligation.status.is_terminal());

    let mut upcoming: Vec<ObligationView> = open()
        .filter(|v| (0..=UPCOMING_WINDOW_DAYS).contains(&v.days_until_due))
        .cloned()
        .collect();
    upcoming.sort_by_key(|v| (v.days_until_due, v.obligation.due_date));

    let mut overdue_list: Vec<ObligationView> = open()
        .filter(|v| v.obligation.status == ObligationStatus::Overdue || v.days_until_due < 0)
        .cloned()
        .collect();
    overdue_list.sort_by_key(|v| (v.days_until_due, v.obligation.due_date));

    ObligationDashboard {
        total: views.len() as u32,
        completed: statuses.completed,
        overdue: statuses.overdue,
        pending: statuses.pending,
        in_progress: statuses.in_progress,
        traffic_light,
        upcoming,
        overdue_list,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use fixtures::obligation;

    const T: Thresholds = Thresholds { yellow: 15, red: 7 };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn light(days: i64, status: ObligationStatus) -> (TrafficLight, i64) {
        calculate_traffic_light(today() + chrono::Duration::days(days), status, T, today())
    }

    #[test]
    fn boundaries_follow_the_whole_day_rule() {
        use ObligationStatus::*;
        assert_eq!(light(30, Pending), (TrafficLight::Green, 30));
        assert_eq!(light(16, Pending), (TrafficLight::Green, 16));
        assert_eq!(light(15, Pending), (TrafficLight::Yellow, 15));
        assert_eq!(light(8, InProgress), (TrafficLight::Yellow, 8));
        assert_eq!(light(7, Pending), (TrafficLight::Red, 7));
        assert_eq!(light(0, Pending), (TrafficLight::Red, 0));
        assert_eq!(light(-3, Pending), (TrafficLight::Red, -3));
    }

    #[test]
    fn terminal_statuses_are_always_green() {
        assert_eq!(light(-10, ObligationStatus::Completed), (TrafficLight::Green, 0));
        assert_eq!(light(2, ObligationStatus::NotApplicable), (TrafficLight::Green, 0));
    }

    #[test]
    fn overdue_status_is_red_even_with_days_left() {
        assert_eq!(light(40, ObligationStatus::Overdue), (TrafficLight::Red, 40));
    }

    #[test]
    fn dashboard_buckets_and_lists() {
        use ObligationStatus::*;
        let d = |n: i64| today() + chrono::Duration::days(n);
        let views = enrich_all(
            vec![
                obligation(d(3), Pending),
                obligation(d(0), InProgress),
                obligation(d(10), Pending),
                obligation(d(60), Pending),
                obligation(d(-2), Overdue),
                obligation(d(-5), Completed),
                obligation(d(1), NotApplicable),
            ],
            T,
            today(),
        );

        let dash = build_dashboard(views);
        assert_eq!(dash.total, 7);
        assert_eq!(dash.completed, 1);
        assert_eq!(dash.overdue, 1);
        assert_eq!(dash.pending, 3);
        assert_eq!(dash.in_progress, 1);
        assert_eq!(dash.traffic_light, TrafficLightCounts { green: 1, yellow: 1, red: 3 });

        let upcoming: Vec<i64> = dash.upcoming.iter().map(|v| v.days_until_due).collect();
        assert_eq!(upcoming, vec![0, 3]);
        let overdue: Vec<i64> = dash.overdue_list.iter().map(|v| v.days_until_due).collect();
        assert_eq!(overdue, vec![-2]);
    }
}
