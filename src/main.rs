// src/main.rs

use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::{
    config::{AppState, Config, LogFormat},
    docs::ApiDoc,
    middleware::auth::auth_guard,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let pool = config::connect(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, pool)?;

    let jobs = app_state.job_runner().start();
    tracing::info!(jobs = jobs.len(), "Jobs agendados iniciados");

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app(app_state)).await?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,cumpliros=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS];
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS liberado para qualquer origem");
        return CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new().allow_origin(origins).allow_methods(methods).allow_headers(Any)
}

/// Todas as rotas da API. Separado do `main` para os testes montarem o mesmo roteador.
pub fn app(app_state: AppState) -> Router {
    // Leituras públicas do catálogo e o fluxo de login
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        .route("/jurisdictions", get(handlers::jurisdictions::list_jurisdictions))
        .route("/jurisdictions/code/{code}", get(handlers::jurisdictions::get_jurisdiction_by_code))
        .route("/jurisdictions/{id}", get(handlers::jurisdictions::get_jurisdiction))
        .route("/templates", get(handlers::templates::list_templates))
        .route("/templates/rubrics", get(handlers::templates::list_rubrics))
        .route("/templates/{id}", get(handlers::templates::get_template));

    // Rotas do usuário e do catálogo (escrita)
    let user_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::get_me))
        .route("/auth/change-password", post(handlers::auth::change_password))
        .route("/auth/accept-invitation", post(handlers::auth::accept_invitation))
        .route("/jurisdictions", post(handlers::jurisdictions::create_jurisdiction))
        .route("/jurisdictions/{id}", patch(handlers::jurisdictions::update_jurisdiction))
        .route("/templates", post(handlers::templates::create_template))
        .route(
            "/templates/{id}",
            patch(handlers::templates::update_template).delete(handlers::templates::deactivate_template),
        )
        .route(
            "/organizations",
            post(handlers::tenancy::create_organization).get(handlers::tenancy::list_my_organizations),
        );

    // Tudo sob /organizations/{organization_id}: membership checada pelo OrgContext
    let organization_routes = Router::new()
        .route(
            "/organizations/{organization_id}",
            get(handlers::tenancy::get_organization)
                .patch(handlers::tenancy::update_organization)
                .delete(handlers::tenancy::deactivate_organization),
        )
        .route("/organizations/{organization_id}/members", get(handlers::tenancy::list_members))
        .route(
            "/organizations/{organization_id}/members/{user_id}",
            patch(handlers::tenancy::change_member_role).delete(handlers::tenancy::remove_member),
        )
        .route(
            "/organizations/{organization_id}/locations",
            get(handlers::tenancy::list_locations).post(handlers::tenancy::create_location),
        )
        .route(
            "/organizations/{organization_id}/locations/{id}",
            patch(handlers::tenancy::update_location).delete(handlers::tenancy::deactivate_location),
        )
        .route(
            "/organizations/{organization_id}/invitations",
            get(handlers::tenancy::list_invitations).post(handlers::tenancy::create_invitation),
        )
        .route(
            "/organizations/{organization_id}/invitations/{id}",
            axum::routing::delete(handlers::tenancy::cancel_invitation),
        )
        .route(
            "/organizations/{organization_id}/templates/apply",
            post(handlers::templates::apply_templates),
        )
        .route(
            "/organizations/{organization_id}/obligations",
            get(handlers::obligations::list_obligations).post(handlers::obligations::create_obligation),
        )
        .route(
            "/organizations/{organization_id}/obligations/dashboard",
            get(handlers::obligations::get_dashboard),
        )
        .route(
            "/organizations/{organization_id}/obligations/calendar",
            get(handlers::obligations::get_calendar),
        )
        .route(
            "/organizations/{organization_id}/obligations/{id}",
            get(handlers::obligations::get_obligation)
                .patch(handlers::obligations::update_obligation)
                .delete(handlers::obligations::delete_obligation),
        )
        .route(
            "/organizations/{organization_id}/obligations/{id}/status",
            patch(handlers::obligations::update_status),
        )
        .route(
            "/organizations/{organization_id}/obligations/{id}/reviews",
            get(handlers::reviews::list_obligation_reviews),
        )
        .route(
            "/organizations/{organization_id}/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/organizations/{organization_id}/tasks/{id}",
            get(handlers::tasks::get_task)
                .patch(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        .route("/organizations/{organization_id}/tasks/{id}/items", post(handlers::tasks::add_item))
        .route(
            "/organizations/{organization_id}/tasks/{id}/items/{item_id}",
            patch(handlers::tasks::update_item).delete(handlers::tasks::delete_item),
        )
        .route(
            "/organizations/{organization_id}/tasks/{id}/items/{item_id}/toggle",
            post(handlers::tasks::toggle_item),
        )
        .route("/organizations/{organization_id}/reviews", post(handlers::reviews::create_review))
        .route(
            "/organizations/{organization_id}/reviews/pending",
            get(handlers::reviews::list_pending_reviews),
        )
        .route(
            "/organizations/{organization_id}/documents",
            get(handlers::documents::list_documents).post(handlers::documents::register_document),
        )
        .route(
            "/organizations/{organization_id}/documents/upload-url",
            post(handlers::documents::request_upload_url),
        )
        .route(
            "/organizations/{organization_id}/documents/{id}",
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        )
        .route("/organizations/{organization_id}/audit", get(handlers::audit::list_audit_events))
        .route(
            "/organizations/{organization_id}/reports/compliance",
            get(handlers::reports::compliance_report),
        )
        .route(
            "/organizations/{organization_id}/reports/obligations",
            get(handlers::reports::obligations_report),
        )
        .route(
            "/organizations/{organization_id}/reports/export/csv",
            get(handlers::reports::export_csv),
        );

    let protected_routes = user_routes
        .merge(organization_routes)
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let cors = cors(&app_state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", public_routes.merge(protected_routes))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::testing::{app_on, TestApp},
        models::tenancy::MemberRole,
        services::test_support::{self as ts, date},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn call(app: &TestApp, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes, _) = call_raw(app, method, uri, token, body).await;
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    async fn call_raw(
        app: &TestApp,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>, Option<String>) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = super::app(app.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        (status, bytes, content_type)
    }

    async fn register(app: &TestApp, email: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": email, "password": "secreta-123", "fullName": "Dueña Pérez" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    async fn create_org(app: &TestApp, token: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/v1/organizations",
            Some(token),
            Some(json!({ "cuit": "30-71234567-8", "name": "Bar La Esquina" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app_on(date(2025, 6, 10));
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_need_a_bearer_token() {
        let app = app_on(date(2025, 6, 10));
        let (status, body) = call(&app, Method::GET, "/api/v1/organizations", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some("no-es-un-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn catalog_reads_are_public() {
        let app = app_on(date(2025, 6, 10));
        let (status, body) = call(&app, Method::GET, "/api/v1/templates?page=1&limit=5", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["limit"], 5);
        assert!(body["data"].is_array());

        let (status, _) = call(&app, Method::GET, "/api/v1/jurisdictions", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn validation_errors_list_every_field() {
        let app = app_on(date(2025, 6, 10));
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "no-mail", "password": "corta", "fullName": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn obligation_flow_returns_traffic_light() {
        let app = app_on(date(2025, 6, 10));
        let token = register(&app, "duena@bar.com").await;
        let org_id = create_org(&app, &token).await;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/organizations/{org_id}/obligations"),
            Some(&token),
            Some(json!({ "title": "Habilitación comercial", "type": "PERMIT", "dueDate": "2025-06-14" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["data"]["trafficLight"], "RED");
        assert_eq!(body["data"]["daysUntilDue"], 4);

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/api/v1/organizations/{org_id}/obligations"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["data"][0]["title"], "Habilitación comercial");

        let id = body["data"][0]["id"].as_str().unwrap().to_string();
        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/api/v1/organizations/{org_id}/obligations/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id.as_str());

        let (status, body) = call(
            &app,
            Method::PATCH,
            &format!("/api/v1/organizations/{org_id}/obligations/{id}/status"),
            Some(&token),
            Some(json!({ "status": "COMPLETED" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["trafficLight"], "GREEN");
    }

    #[tokio::test]
    async fn roles_and_membership_are_enforced() {
        let app = app_on(date(2025, 6, 10));
        let owner_token = register(&app, "duena@bar.com").await;
        let org_id = create_org(&app, &owner_token).await;
        let accountant_token = register(&app, "contadora@estudio.com").await;

        // Ainda não é membro
        let uri = format!("/api/v1/organizations/{org_id}/obligations");
        let (status, _) = call(&app, Method::GET, &uri, Some(&accountant_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let repos = &app.state.repos;
        let org = repos.organizations.find_by_id(Uuid::parse_str(&org_id).unwrap()).await.unwrap().unwrap();
        let accountant = repos.users.find_by_email("contadora@estudio.com").await.unwrap().unwrap();
        ts::member(repos, &org, &accountant, MemberRole::Accountant).await;

        let (status, _) = call(&app, Method::GET, &uri, Some(&accountant_token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::POST,
            &uri,
            Some(&accountant_token),
            Some(json!({ "title": "Seguro", "type": "INSURANCE", "dueDate": "2025-07-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        // Contadora lê relatórios
        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/v1/organizations/{org_id}/reports/compliance"),
            Some(&accountant_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn csv_export_is_an_attachment() {
        let app = app_on(date(2025, 6, 10));
        let token = register(&app, "duena@bar.com").await;
        let org_id = create_org(&app, &token).await;

        let (status, bytes, content_type) = call_raw(
            &app,
            Method::GET,
            &format!("/api/v1/organizations/{org_id}/reports/export/csv"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/csv"));
        assert!(String::from_utf8(bytes).unwrap().starts_with("\"ID\""));
    }

    #[tokio::test]
    async fn unknown_organization_is_not_found() {
        let app = app_on(date(2025, 6, 10));
        let token = register(&app, "duena@bar.com").await;
        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/v1/organizations/{}/obligations", Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
