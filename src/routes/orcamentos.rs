use axum::extract::{Path, State};
use axum::response::Json;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{
    erro_campo, erro_conflito, erro_interno, erro_nao_encontrado, erro_proibido, erro_validacao,
    ApiResult,
};
use crate::models::item::ItemOrcamento;
use crate::models::orcamento::{mes_anterior, CreateOrcamentoRequest, Orcamento};
use crate::routes::atividades::registrar_atividade;
use crate::routes::grupos::{buscar_grupo, eh_membro};
use crate::AppState;

// Obtém ou cria o orçamento do período. Na criação, os itens planejados do
// mês-calendário anterior são copiados para o período novo, com autoria do
// solicitante.
pub async fn create_orcamento(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrcamentoRequest>,
) -> ApiResult {
    // Valida as datas
    let data_inicio = match NaiveDate::parse_from_str(&payload.data_inicio, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return Err(erro_validacao(
                "Dados inválidos.",
                vec![erro_campo("data_inicio", "Data inválida. Use o formato YYYY-MM-DD.")],
            ))
        }
    };
    let data_fim = match NaiveDate::parse_from_str(&payload.data_fim, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return Err(erro_validacao(
                "Dados inválidos.",
                vec![erro_campo("data_fim", "Data inválida. Use o formato YYYY-MM-DD.")],
            ))
        }
    };
    if data_fim < data_inicio {
        return Err(erro_validacao(
            "Dados inválidos.",
            vec![erro_campo("data_fim", "Data final deve ser igual ou posterior à inicial.")],
        ));
    }

    if buscar_grupo(&state.db, payload.grupo_id)
        .await
        .map_err(erro_interno)?
        .is_none()
    {
        return Err(erro_nao_encontrado("Grupo não encontrado."));
    }

    if !eh_membro(&state.db, payload.grupo_id, user.id)
        .await
        .map_err(erro_interno)?
    {
        return Err(erro_proibido("Você não é membro deste grupo."));
    }

    // Período já existente é devolvido como está (get-or-create)
    let existente = sqlx::query_as::<_, Orcamento>(
        "SELECT * FROM orcamentos \
         WHERE grupo_id = $1 AND data_inicio = $2 AND data_fim = $3",
    )
    .bind(payload.grupo_id)
    .bind(data_inicio)
    .bind(data_fim)
    .fetch_optional(&state.db)
    .await
    .map_err(erro_interno)?;

    if let Some(orcamento) = existente {
        return Ok(Json(json!({
            "success": true,
            "message": "Orçamento já existente para o período.",
            "data": orcamento
        })));
    }

    // Itens do mês anterior, se houver orçamento para ele
    let (inicio_anterior, fim_anterior) = mes_anterior(data_inicio);

    let orcamento_anterior = sqlx::query_as::<_, Orcamento>(
        "SELECT * FROM orcamentos \
         WHERE grupo_id = $1 AND data_inicio = $2 AND data_fim = $3",
    )
    .bind(payload.grupo_id)
    .bind(inicio_anterior)
    .bind(fim_anterior)
    .fetch_optional(&state.db)
    .await
    .map_err(erro_interno)?;

    let itens_anteriores = match &orcamento_anterior {
        Some(anterior) => sqlx::query_as::<_, ItemOrcamento>(
            "SELECT * FROM orcamento_itens WHERE orcamento_id = $1 ORDER BY created_at ASC",
        )
        .bind(anterior.id)
        .fetch_all(&state.db)
        .await
        .map_err(erro_interno)?,
        None => Vec::new(),
    };

    // Orçamento e cópias nascem juntos
    let mut tx = state.db.begin().await.map_err(erro_interno)?;

    let orcamento = sqlx::query_as::<_, Orcamento>(
        "INSERT INTO orcamentos (id, grupo_id, data_inicio, data_fim, criado_por) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.grupo_id)
    .bind(data_inicio)
    .bind(data_fim)
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        // Corrida entre duas criações do mesmo período: o índice único
        // derruba a segunda inserção.
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                return erro_conflito("Já existe um orçamento para este período.");
            }
        }
        erro_interno(err)
    })?;

    for item in &itens_anteriores {
        sqlx::query(
            "INSERT INTO orcamento_itens \
             (id, orcamento_id, grupo_id, categoria, nome, valor_planejado, criado_por) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(orcamento.id)
        .bind(payload.grupo_id)
        .bind(&item.categoria)
        .bind(&item.nome)
        .bind(item.valor_planejado)
        .bind(user.id) // autoria da cópia é de quem pediu o período novo
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;
    }

    tx.commit().await.map_err(erro_interno)?;

    // A cópia em si não gera atividade; só a criação do período
    registrar_atividade(
        &state.db,
        payload.grupo_id,
        &user,
        "orcamento_criado",
        format!(
            "{} criou o orçamento de {} a {}",
            user.nome, orcamento.data_inicio, orcamento.data_fim
        ),
        json!({
            "orcamento_id": orcamento.id,
            "data_inicio": orcamento.data_inicio,
            "data_fim": orcamento.data_fim,
        }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Orçamento criado com sucesso!",
        "data": orcamento,
        "itens_copiados": itens_anteriores.len()
    })))
}

pub async fn get_orcamentos_grupo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(grupo_id): Path<Uuid>,
) -> ApiResult {
    if buscar_grupo(&state.db, grupo_id)
        .await
        .map_err(erro_interno)?
        .is_none()
    {
        return Err(erro_nao_encontrado("Grupo não encontrado."));
    }

    if !eh_membro(&state.db, grupo_id, user.id)
        .await
        .map_err(erro_interno)?
    {
        return Err(erro_proibido("Você não é membro deste grupo."));
    }

    let orcamentos = sqlx::query_as::<_, Orcamento>(
        "SELECT * FROM orcamentos WHERE grupo_id = $1 ORDER BY data_inicio DESC",
    )
    .bind(grupo_id)
    .fetch_all(&state.db)
    .await
    .map_err(erro_interno)?;

    Ok(Json(json!({
        "success": true,
        "data": orcamentos
    })))
}

pub async fn get_orcamento_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(orcamento_id): Path<Uuid>,
) -> ApiResult {
    let orcamento = sqlx::query_as::<_, Orcamento>("SELECT * FROM orcamentos WHERE id = $1")
        .bind(orcamento_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    // Existência antes de autorização
    let orcamento = match orcamento {
        Some(o) => o,
        None => return Err(erro_nao_encontrado("Orçamento não encontrado.")),
    };

    if !eh_membro(&state.db, orcamento.grupo_id, user.id)
        .await
        .map_err(erro_interno)?
    {
        return Err(erro_proibido("Você não é membro deste grupo."));
    }

    Ok(Json(json!({
        "success": true,
        "data": orcamento
    })))
}

pub async fn delete_orcamento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(orcamento_id): Path<Uuid>,
) -> ApiResult {
    let orcamento = sqlx::query_as::<_, Orcamento>("SELECT * FROM orcamentos WHERE id = $1")
        .bind(orcamento_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    let orcamento = match orcamento {
        Some(o) => o,
        None => return Err(erro_nao_encontrado("Orçamento não encontrado.")),
    };

    if orcamento.criado_por != user.id {
        return Err(erro_proibido("Apenas o criador pode excluir o orçamento."));
    }

    let mut tx = state.db.begin().await.map_err(erro_interno)?;

    sqlx::query("DELETE FROM orcamento_itens WHERE orcamento_id = $1")
        .bind(orcamento_id)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    sqlx::query("DELETE FROM orcamentos WHERE id = $1")
        .bind(orcamento_id)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    tx.commit().await.map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        orcamento.grupo_id,
        &user,
        "orcamento_excluido",
        format!(
            "{} excluiu o orçamento de {} a {}",
            user.nome, orcamento.data_inicio, orcamento.data_fim
        ),
        json!({
            "data_inicio": orcamento.data_inicio,
            "data_fim": orcamento.data_fim,
        }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Orçamento excluído."
    })))
}
