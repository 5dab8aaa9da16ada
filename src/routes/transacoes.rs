use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{
    erro_campo, erro_interno, erro_nao_encontrado, erro_proibido, erro_validacao, ApiResult,
};
use crate::models::transacao::{
    validar_transacao, CreateTransacaoRequest, Transacao, UpdateTransacaoRequest,
};
use crate::routes::atividades::registrar_atividade;
use crate::routes::grupos::{buscar_grupo, eh_membro};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TransacoesQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

pub async fn create_transacao(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTransacaoRequest>,
) -> ApiResult {
    // Valida entrada
    let mut erros: Vec<_> = validar_transacao(
        &payload.categoria,
        &payload.tipo,
        payload.valor,
        payload.descricao.as_deref(),
    )
    .into_iter()
    .map(|(campo, msg)| erro_campo(campo, &msg))
    .collect();

    let data = match NaiveDate::parse_from_str(&payload.data, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            erros.push(erro_campo("data", "Data inválida. Use o formato YYYY-MM-DD."));
            None
        }
    };

    if !erros.is_empty() {
        return Err(erro_validacao("Dados inválidos.", erros));
    }
    let data = data.unwrap();

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

    let transacao = sqlx::query_as::<_, Transacao>(
        "INSERT INTO transacoes \
         (id, grupo_id, categoria, tipo, valor, data, descricao, criado_por, criado_por_nome) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.grupo_id)
    .bind(&payload.categoria)
    .bind(payload.tipo.trim())
    .bind(payload.valor)
    .bind(data)
    .bind(payload.descricao.as_deref().map(str::trim))
    .bind(user.id)
    .bind(&user.nome) // nome desnormalizado para listagens sem join
    .fetch_one(&state.db)
    .await
    .map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        payload.grupo_id,
        &user,
        "transacao_criada",
        format!(
            "{} registrou \"{}\" ({}) de {}",
            user.nome, transacao.tipo, transacao.categoria, transacao.valor
        ),
        json!({
            "transacao_id": transacao.id,
            "categoria": transacao.categoria,
            "valor": transacao.valor,
            "data": transacao.data,
        }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Transação registrada!",
        "data": transacao
    })))
}

// Transações do grupo no intervalo [startDate, endDate], inclusivo nas
// duas pontas. Intervalo sem transações responde 404.
pub async fn get_transacoes_grupo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(grupo_id): Path<Uuid>,
    Query(query): Query<TransacoesQuery>,
) -> ApiResult {
    let mut erros = Vec::new();

    let start_date = match query.start_date.as_deref() {
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                erros.push(erro_campo("startDate", "Data inválida. Use o formato YYYY-MM-DD."));
                None
            }
        },
        None => {
            erros.push(erro_campo("startDate", "startDate é obrigatório."));
            None
        }
    };

    let end_date = match query.end_date.as_deref() {
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                erros.push(erro_campo("endDate", "Data inválida. Use o formato YYYY-MM-DD."));
                None
            }
        },
        None => {
            erros.push(erro_campo("endDate", "endDate é obrigatório."));
            None
        }
    };

    if !erros.is_empty() {
        return Err(erro_validacao("Dados inválidos.", erros));
    }
    let (start_date, end_date) = (start_date.unwrap(), end_date.unwrap());

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

    let transacoes = sqlx::query_as::<_, Transacao>(
        "SELECT * FROM transacoes \
         WHERE grupo_id = $1 AND data >= $2 AND data <= $3 \
         ORDER BY data DESC, created_at DESC",
    )
    .bind(grupo_id)
    .bind(start_date)
    .bind(end_date)
    .fetch_all(&state.db)
    .await
    .map_err(erro_interno)?;

    if transacoes.is_empty() {
        return Err(erro_nao_encontrado("Nenhuma transação encontrada no período."));
    }

    Ok(Json(json!({
        "success": true,
        "data": transacoes
    })))
}

pub async fn get_transacao_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transacao_id): Path<Uuid>,
) -> ApiResult {
    let transacao = sqlx::query_as::<_, Transacao>("SELECT * FROM transacoes WHERE id = $1")
        .bind(transacao_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    let transacao = match transacao {
        Some(t) => t,
        None => return Err(erro_nao_encontrado("Transação não encontrada.")),
    };

    if !eh_membro(&state.db, transacao.grupo_id, user.id)
        .await
        .map_err(erro_interno)?
    {
        return Err(erro_proibido("Você não é membro deste grupo."));
    }

    Ok(Json(json!({
        "success": true,
        "data": transacao
    })))
}

pub async fn update_transacao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transacao_id): Path<Uuid>,
    Json(payload): Json<UpdateTransacaoRequest>,
) -> ApiResult {
    let transacao = sqlx::query_as::<_, Transacao>("SELECT * FROM transacoes WHERE id = $1")
        .bind(transacao_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    let transacao = match transacao {
        Some(t) => t,
        None => return Err(erro_nao_encontrado("Transação não encontrada.")),
    };

    // Só o autor original altera; não há exceção para admins
    if transacao.criado_por != user.id {
        return Err(erro_proibido("Apenas o autor pode alterar esta transação."));
    }

    // Valida o resultado da mesclagem, não só os campos enviados
    let categoria = payload.categoria.as_deref().unwrap_or(&transacao.categoria);
    let tipo = payload.tipo.as_deref().unwrap_or(&transacao.tipo);
    let valor = payload.valor.unwrap_or(transacao.valor);
    let descricao = payload
        .descricao
        .as_deref()
        .or(transacao.descricao.as_deref());

    let mut erros: Vec<_> = validar_transacao(categoria, tipo, valor, descricao)
        .into_iter()
        .map(|(campo, msg)| erro_campo(campo, &msg))
        .collect();

    let data = match payload.data.as_deref() {
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                erros.push(erro_campo("data", "Data inválida. Use o formato YYYY-MM-DD."));
                None
            }
        },
        None => None,
    };

    if !erros.is_empty() {
        return Err(erro_validacao("Dados inválidos.", erros));
    }

    let atualizada = sqlx::query_as::<_, Transacao>(
        "UPDATE transacoes SET \
         categoria = COALESCE($1, categoria), \
         tipo = COALESCE($2, tipo), \
         valor = COALESCE($3, valor), \
         data = COALESCE($4, data), \
         descricao = COALESCE($5, descricao), \
         updated_at = NOW() \
         WHERE id = $6 RETURNING *",
    )
    .bind(payload.categoria.as_deref())
    .bind(payload.tipo.as_deref().map(str::trim))
    .bind(payload.valor)
    .bind(data)
    .bind(payload.descricao.as_deref().map(str::trim))
    .bind(transacao_id)
    .fetch_one(&state.db)
    .await
    .map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        transacao.grupo_id,
        &user,
        "transacao_atualizada",
        format!(
            "{} alterou \"{}\" de {} ({}) para {} ({})",
            user.nome,
            atualizada.tipo,
            transacao.valor,
            transacao.categoria,
            atualizada.valor,
            atualizada.categoria
        ),
        json!({
            "transacao_id": transacao.id,
            "valor_anterior": transacao.valor,
            "valor_novo": atualizada.valor,
            "categoria_anterior": transacao.categoria,
            "categoria_nova": atualizada.categoria,
        }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Transação atualizada!",
        "data": atualizada
    })))
}

pub async fn delete_transacao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transacao_id): Path<Uuid>,
) -> ApiResult {
    let transacao = sqlx::query_as::<_, Transacao>("SELECT * FROM transacoes WHERE id = $1")
        .bind(transacao_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    let transacao = match transacao {
        Some(t) => t,
        None => return Err(erro_nao_encontrado("Transação não encontrada.")),
    };

    if transacao.criado_por != user.id {
        return Err(erro_proibido("Apenas o autor pode excluir esta transação."));
    }

    sqlx::query("DELETE FROM transacoes WHERE id = $1")
        .bind(transacao_id)
        .execute(&state.db)
        .await
        .map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        transacao.grupo_id,
        &user,
        "transacao_excluida",
        format!(
            "{} removeu \"{}\" ({}) de {}",
            user.nome, transacao.tipo, transacao.categoria, transacao.valor
        ),
        json!({
            "transacao_id": transacao.id,
            "categoria": transacao.categoria,
            "valor": transacao.valor,
        }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Transação excluída."
    })))
}
