use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{json, Value};

/// Forma de erro usada por todos os handlers: status HTTP + envelope JSON
/// `{ success: false, error, message, details? }`.
pub type ErroApi = (StatusCode, Json<Value>);

pub type ApiResult = Result<Json<Value>, ErroApi>;

pub fn erro_validacao(message: &str, details: Vec<Value>) -> ErroApi {
    let mut body = json!({
        "success": false,
        "error": "validation_error",
        "message": message,
    });
    if !details.is_empty() {
        body["details"] = Value::Array(details);
    }
    (StatusCode::BAD_REQUEST, Json(body))
}

/// Um erro de campo dentro de `details`.
pub fn erro_campo(campo: &str, mensagem: &str) -> Value {
    json!({ "field": campo, "message": mensagem })
}

pub fn erro_nao_autorizado(message: &str) -> ErroApi {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": "authentication_error",
            "message": message,
        })),
    )
}

pub fn erro_proibido(message: &str) -> ErroApi {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "success": false,
            "error": "authorization_error",
            "message": message,
        })),
    )
}

pub fn erro_nao_encontrado(message: &str) -> ErroApi {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "not_found",
            "message": message,
        })),
    )
}

pub fn erro_conflito(message: &str) -> ErroApi {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "success": false,
            "error": "conflict",
            "message": message,
        })),
    )
}

/// Erro inesperado: loga o detalhe no servidor, responde mensagem genérica.
pub fn erro_interno(err: impl std::fmt::Debug) -> ErroApi {
    tracing::error!(?err, "erro interno");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": "internal_error",
            "message": "Ocorreu um erro no servidor.",
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validacao_retorna_400_com_details() {
        let (status, Json(body)) =
            erro_validacao("Dados inválidos.", vec![erro_campo("valor", "obrigatório")]);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["details"][0]["field"], "valor");
    }

    #[test]
    fn validacao_sem_details_omite_o_campo() {
        let (_, Json(body)) = erro_validacao("Dados inválidos.", vec![]);
        assert!(body.get("details").is_none());
    }

    #[test]
    fn mapeamento_de_status() {
        assert_eq!(erro_nao_autorizado("x").0, StatusCode::UNAUTHORIZED);
        assert_eq!(erro_proibido("x").0, StatusCode::FORBIDDEN);
        assert_eq!(erro_nao_encontrado("x").0, StatusCode::NOT_FOUND);
        assert_eq!(erro_conflito("x").0, StatusCode::CONFLICT);
        assert_eq!(erro_interno("boom").0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
