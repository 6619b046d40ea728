// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

/// Um par campo/mensagem devolvido em `error.details` nas falhas de validação.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validações manuais (regras entre campos) que não cabem no derive.
    #[error("Error de validación")]
    ValidationFailed(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Credenciales inválidas")]
    InvalidCredentials,

    #[error("Error de almacenamiento: {0}")]
    Storage(String),

    #[error("Error de base de datos: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Error interno del servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Error de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Error de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(format!("{} no encontrado", entity))
    }

    pub fn field(field: &str, message: &str) -> Self {
        AppError::ValidationFailed(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Código estável que o frontend usa para decidir o que mostrar.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::ValidationFailed(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Unauthorized(_) | AppError::InvalidCredentials => "UNAUTHORIZED",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Todos os erros de campo, não só o primeiro.
    pub fn details(&self) -> Option<Vec<FieldError>> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details: Vec<FieldError> = errors
                    .field_errors()
                    .into_iter()
                    .flat_map(|(field, field_errors)| {
                        field_errors.iter().map(move |e| {
                            let message = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string());
                            FieldError::new(field.to_string(), message)
                        })
                    })
                    .collect();
                details.sort_by(|a, b| a.field.cmp(&b.field));
                Some(details)
            }
            AppError::ValidationFailed(details) => Some(details.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Erros internos não vazam detalhes; o `tracing` guarda a mensagem completa.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Error interno del servidor");
            "Ocurrió un error inesperado.".to_string()
        } else {
            self.to_string()
        };

        let mut error = json!({
            "code": self.code(),
            "message": message,
        });
        if let Some(details) = self.details() {
            error["details"] = json!(details);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
