// src/models/dashboard.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::obligation::ObligationView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLightCounts {
    pub green: u32,
    pub yellow: u32,
    pub red: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub overdue: u32,
    pub not_applicable: u32,
}

/// Painel da organização: contadores + listas de próximas e vencidas.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObligationDashboard {
    pub total: u32,
    pub completed: u32,
    pub overdue: u32,
    pub pending: u32,
    pub in_progress: u32,
    pub traffic_light: TrafficLightCounts,
    pub upcoming: Vec<ObligationView>,
    pub overdue_list: Vec<ObligationView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub total: u32,
    pub by_status: StatusCounts,
    pub by_traffic_light: TrafficLightCounts,
    /// completed / (total - notApplicable) * 100, uma casa decimal.
    #[schema(example = 87.5)]
    pub compliance_rate: f64,
    pub overdue: u32,
    /// % das obrigações que exigem evidência e já têm documentos suficientes.
    #[schema(example = 60.0)]
    pub evidence_coverage: f64,
}
