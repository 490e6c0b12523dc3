use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Acesso negado: {0}")]
    AccessDenied(String),

    #[error("Não autorizado: o token de acesso pode ter expirado")]
    Unauthorized,

    #[error("Recurso não encontrado: {0}")]
    NotFound(String),

    #[error("Muitas requisições: aguarde antes de tentar de novo")]
    RateLimited,

    #[error("Erro no servidor: {0}")]
    ServerError(String),

    #[error("Erro do backend {code}: {message}")]
    Backend { code: String, message: String },

    #[error("Erro de rede: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Falha ao decodificar a linha: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Cabeçalho de credencial inválido: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Resposta inválida: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body returned by the hosted backend's REST layer.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncado, {} bytes no total)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => match serde_json::from_str::<BackendErrorBody>(body) {
                Ok(BackendErrorBody {
                    code: Some(code),
                    message,
                }) => ApiError::Backend {
                    code,
                    message: message.unwrap_or_default(),
                },
                _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
            },
        }
    }
}
