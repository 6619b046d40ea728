pub mod audit_service;
pub mod auth;
pub mod document_service;
pub mod jobs;
pub mod jurisdiction_service;
pub mod mailer;
pub mod notification_service;
pub mod obligation_service;
pub mod report_service;
pub mod review_service;
pub mod storage;
pub mod task_service;
pub mod template_service;
pub mod tenancy_service;
pub mod traffic_light;

#[cfg(test)]
pub mod test_support;
