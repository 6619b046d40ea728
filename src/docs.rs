// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "CumpliRos API", description = "Vencimientos, habilitaciones y evidencias de comercios"),
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::get_me,
        handlers::auth::change_password,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::accept_invitation,

        // --- Jurisdictions ---
        handlers::jurisdictions::list_jurisdictions,
        handlers::jurisdictions::get_jurisdiction,
        handlers::jurisdictions::get_jurisdiction_by_code,
        handlers::jurisdictions::create_jurisdiction,
        handlers::jurisdictions::update_jurisdiction,

        // --- Templates ---
        handlers::templates::list_templates,
        handlers::templates::list_rubrics,
        handlers::templates::get_template,
        handlers::templates::create_template,
        handlers::templates::update_template,
        handlers::templates::deactivate_template,
        handlers::templates::apply_templates,

        // --- Organizations ---
        handlers::tenancy::create_organization,
        handlers::tenancy::list_my_organizations,
        handlers::tenancy::get_organization,
        handlers::tenancy::update_organization,
        handlers::tenancy::deactivate_organization,
        handlers::tenancy::list_members,
        handlers::tenancy::change_member_role,
        handlers::tenancy::remove_member,
        handlers::tenancy::list_locations,
        handlers::tenancy::create_location,
        handlers::tenancy::update_location,
        handlers::tenancy::deactivate_location,
        handlers::tenancy::create_invitation,
        handlers::tenancy::list_invitations,
        handlers::tenancy::cancel_invitation,

        // --- Obligations ---
        handlers::obligations::list_obligations,
        handlers::obligations::create_obligation,
        handlers::obligations::get_dashboard,
        handlers::obligations::get_calendar,
        handlers::obligations::get_obligation,
        handlers::obligations::update_obligation,
        handlers::obligations::update_status,
        handlers::obligations::delete_obligation,

        // --- Tasks ---
        handlers::tasks::list_tasks,
        handlers::tasks::create_task,
        handlers::tasks::get_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,
        handlers::tasks::add_item,
        handlers::tasks::update_item,
        handlers::tasks::toggle_item,
        handlers::tasks::delete_item,

        // --- Reviews ---
        handlers::reviews::create_review,
        handlers::reviews::list_pending_reviews,
        handlers::reviews::list_obligation_reviews,

        // --- Documents ---
        handlers::documents::request_upload_url,
        handlers::documents::register_document,
        handlers::documents::list_documents,
        handlers::documents::get_document,
        handlers::documents::delete_document,

        // --- Audit / Reports ---
        handlers::audit::list_audit_events,
        handlers::reports::compliance_report,
        handlers::reports::obligations_report,
        handlers::reports::export_csv,
    ),
    components(
        schemas(
            common::error::FieldError,
            common::response::PageMeta,

            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::RefreshTokenPayload,
            models::auth::ChangePasswordPayload,
            models::auth::ForgotPasswordPayload,
            models::auth::ResetPasswordPayload,
            models::auth::AcceptInvitationPayload,
            models::auth::AuthResponse,

            // --- Jurisdictions / Templates ---
            models::jurisdiction::Jurisdiction,
            models::jurisdiction::CreateJurisdictionPayload,
            models::jurisdiction::UpdateJurisdictionPayload,
            models::template::Periodicity,
            models::template::Severity,
            models::template::ObligationTemplate,
            models::template::TemplateChecklistItem,
            models::template::TemplateDetail,
            models::template::ChecklistItemPayload,
            models::template::CreateTemplatePayload,
            models::template::UpdateTemplatePayload,
            models::template::ApplyTemplatesPayload,
            models::template::ApplyTemplatesResult,

            // --- Tenancy ---
            models::tenancy::Plan,
            models::tenancy::Organization,
            models::tenancy::OrganizationWithRole,
            models::tenancy::MemberRole,
            models::tenancy::Membership,
            models::tenancy::MemberDetail,
            models::tenancy::Location,
            models::tenancy::InvitationStatus,
            models::tenancy::Invitation,
            models::tenancy::CreateOrganizationPayload,
            models::tenancy::UpdateOrganizationPayload,
            models::tenancy::UpdateMemberRolePayload,
            models::tenancy::CreateLocationPayload,
            models::tenancy::UpdateLocationPayload,
            models::tenancy::CreateInvitationPayload,

            // --- Obligations ---
            models::obligation::ObligationType,
            models::obligation::ObligationStatus,
            models::obligation::TrafficLight,
            models::obligation::Obligation,
            models::obligation::ObligationView,
            models::obligation::CreateObligationPayload,
            models::obligation::UpdateObligationPayload,
            models::obligation::UpdateStatusPayload,
            models::dashboard::TrafficLightCounts,
            models::dashboard::StatusCounts,
            models::dashboard::ObligationDashboard,
            models::dashboard::ComplianceReport,

            // --- Tasks / Reviews ---
            models::task::TaskStatus,
            models::task::Task,
            models::task::TaskItem,
            models::task::TaskView,
            models::task::CreateTaskPayload,
            models::task::UpdateTaskPayload,
            models::task::CreateTaskItemPayload,
            models::task::UpdateTaskItemPayload,
            models::review::ReviewStatus,
            models::review::Review,
            models::review::CreateReviewPayload,
            models::review::PendingReview,

            // --- Documents / Audit ---
            models::document::Document,
            models::document::DocumentView,
            models::document::RequestUploadUrlPayload,
            models::document::UploadUrlResponse,
            models::document::RegisterDocumentPayload,
            models::audit::AuditEvent,
        )
    ),
    tags(
        (name = "Auth", description = "Registro, sesión y contraseñas"),
        (name = "Jurisdictions", description = "Ámbitos regulatorios"),
        (name = "Templates", description = "Catálogo de obligaciones por rubro"),
        (name = "Organizations", description = "Organizaciones y miembros"),
        (name = "Locations", description = "Locales de la organización"),
        (name = "Invitations", description = "Invitaciones a la organización"),
        (name = "Obligations", description = "Vencimientos, semáforo y calendario"),
        (name = "Tasks", description = "Tareas y checklists"),
        (name = "Reviews", description = "Aprobaciones y rechazos"),
        (name = "Documents", description = "Evidencias en almacenamiento de objetos"),
        (name = "Audit", description = "Registro de auditoría"),
        (name = "Reports", description = "Cumplimiento y exportaciones")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
