use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::Database;
use crate::errors::{erro_interno, erro_nao_encontrado, erro_proibido, ApiResult};
use crate::models::atividade::{Atividade, AtividadeQuery};
use crate::routes::grupos::{buscar_grupo, eh_membro};
use crate::AppState;

/// Registra uma entrada no histórico do grupo. Melhor esforço: falha de
/// escrita é registrada no log do servidor e descartada, nunca derruba a
/// operação principal.
pub async fn registrar_atividade(
    db: &Database,
    grupo_id: Uuid,
    user: &AuthUser,
    acao: &str,
    descricao: String,
    detalhes: Value,
) {
    let resultado = sqlx::query(
        "INSERT INTO atividades (id, grupo_id, user_id, user_nome, acao, descricao, detalhes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::new_v4())
    .bind(grupo_id)
    .bind(user.id)
    .bind(&user.nome)
    .bind(acao)
    .bind(&descricao)
    .bind(&detalhes)
    .execute(db)
    .await;

    if let Err(err) = resultado {
        tracing::warn!(?err, acao, %grupo_id, "falha ao registrar atividade");
    }
}

// Histórico do grupo, mais recentes primeiro, com paginação limit/skip.
pub async fn get_atividades_grupo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(grupo_id): Path<Uuid>,
    Query(query): Query<AtividadeQuery>,
) -> ApiResult {
    // Existência antes de autorização
    let grupo = buscar_grupo(&state.db, grupo_id)
        .await
        .map_err(erro_interno)?;

    if grupo.is_none() {
        return Err(erro_nao_encontrado("Grupo não encontrado."));
    }

    if !eh_membro(&state.db, grupo_id, user.id)
        .await
        .map_err(erro_interno)?
    {
        return Err(erro_proibido("Você não é membro deste grupo."));
    }

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let skip = query.skip.unwrap_or(0).max(0);

    let atividades = sqlx::query_as::<_, Atividade>(
        "SELECT * FROM atividades WHERE grupo_id = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(grupo_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(&state.db)
    .await
    .map_err(erro_interno)?;

    Ok(Json(json!({
        "success": true,
        "data": atividades
    })))
}
