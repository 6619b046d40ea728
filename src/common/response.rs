// src/common/response.rs

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

// Envelope padrão `{ data: ... }` para respostas não paginadas
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

pub fn data<T: Serialize>(payload: T) -> Json<DataResponse<T>> {
    Json(DataResponse { data: payload })
}

/// Parâmetros de paginação já normalizados (página >= 1, limite entre 1 e 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl PageParams {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    /// Fatia uma lista já carregada em memória.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset() as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Resultado paginado vindo de um repositório.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { items: self.items.into_iter().map(f).collect(), total: self.total }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageMeta {
    pub fn new(total: i64, params: PageParams) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            ((total as u64).div_ceil(u64::from(params.limit))) as u32
        };
        Self {
            total,
            page: params.page,
            limit: params.limit,
            total_pages,
            has_next_page: params.page < total_pages,
            has_previous_page: params.page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

pub fn paginated<T: Serialize>(page: Page<T>, params: PageParams) -> Json<PaginatedResponse<T>> {
    Json(PaginatedResponse {
        meta: PageMeta::new(page.total, params),
        data: page.items,
    })
}
