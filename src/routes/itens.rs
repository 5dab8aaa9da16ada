use axum::extract::{Path, State};
use axum::response::Json;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{
    erro_campo, erro_interno, erro_nao_encontrado, erro_proibido, erro_validacao, ApiResult,
};
use crate::models::item::{
    particionar_por_categoria, Categoria, CreateItemRequest, ItemOrcamento, UpdateItemRequest,
};
use crate::models::orcamento::Orcamento;
use crate::routes::atividades::registrar_atividade;
use crate::routes::grupos::eh_membro;
use crate::AppState;

pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> ApiResult {
    // Valida entrada
    let mut erros = Vec::new();
    if Categoria::parse(&payload.categoria).is_none() {
        erros.push(erro_campo(
            "categoria",
            "Categoria deve ser renda, despesa, conta ou poupanca.",
        ));
    }
    if payload.nome.trim().is_empty() {
        erros.push(erro_campo("nome", "Nome é obrigatório."));
    }
    if payload.valor_planejado < Decimal::ZERO {
        erros.push(erro_campo("valor_planejado", "Valor não pode ser negativo."));
    }
    if !erros.is_empty() {
        return Err(erro_validacao("Dados inválidos.", erros));
    }

    let orcamento = sqlx::query_as::<_, Orcamento>("SELECT * FROM orcamentos WHERE id = $1")
        .bind(payload.orcamento_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

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

    let item = sqlx::query_as::<_, ItemOrcamento>(
        "INSERT INTO orcamento_itens \
         (id, orcamento_id, grupo_id, categoria, nome, valor_planejado, criado_por) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(orcamento.id)
    .bind(orcamento.grupo_id)
    .bind(&payload.categoria)
    .bind(payload.nome.trim())
    .bind(payload.valor_planejado)
    .bind(user.id)
    .fetch_one(&state.db)
    .await
    .map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        orcamento.grupo_id,
        &user,
        "item_criado",
        format!(
            "{} planejou \"{}\" ({}) em {}",
            user.nome, item.nome, item.categoria, item.valor_planejado
        ),
        json!({
            "item_id": item.id,
            "categoria": item.categoria,
            "valor_planejado": item.valor_planejado,
        }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Item adicionado ao orçamento!",
        "data": item
    })))
}

// Itens do orçamento particionados por categoria, com a soma de cada uma.
pub async fn get_itens_orcamento(
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

    if !eh_membro(&state.db, orcamento.grupo_id, user.id)
        .await
        .map_err(erro_interno)?
    {
        return Err(erro_proibido("Você não é membro deste grupo."));
    }

    let itens = sqlx::query_as::<_, ItemOrcamento>(
        "SELECT * FROM orcamento_itens WHERE orcamento_id = $1 ORDER BY created_at ASC",
    )
    .bind(orcamento_id)
    .fetch_all(&state.db)
    .await
    .map_err(erro_interno)?;

    let categorias = particionar_por_categoria(itens);

    Ok(Json(json!({
        "success": true,
        "data": {
            "orcamento": orcamento,
            "categorias": categorias,
        }
    })))
}

pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> ApiResult {
    let mut erros = Vec::new();
    if let Some(categoria) = &payload.categoria {
        if Categoria::parse(categoria).is_none() {
            erros.push(erro_campo(
                "categoria",
                "Categoria deve ser renda, despesa, conta ou poupanca.",
            ));
        }
    }
    if let Some(nome) = &payload.nome {
        if nome.trim().is_empty() {
            erros.push(erro_campo("nome", "Nome é obrigatório."));
        }
    }
    if let Some(valor) = payload.valor_planejado {
        if valor < Decimal::ZERO {
            erros.push(erro_campo("valor_planejado", "Valor não pode ser negativo."));
        }
    }
    if !erros.is_empty() {
        return Err(erro_validacao("Dados inválidos.", erros));
    }

    let item = sqlx::query_as::<_, ItemOrcamento>("SELECT * FROM orcamento_itens WHERE id = $1")
        .bind(item_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    let item = match item {
        Some(i) => i,
        None => return Err(erro_nao_encontrado("Item não encontrado.")),
    };

    // Só o autor original mexe no item; não há exceção para admins
    if item.criado_por != user.id {
        return Err(erro_proibido("Apenas o autor pode alterar este item."));
    }

    let atualizado = sqlx::query_as::<_, ItemOrcamento>(
        "UPDATE orcamento_itens SET \
         categoria = COALESCE($1, categoria), \
         nome = COALESCE($2, nome), \
         valor_planejado = COALESCE($3, valor_planejado), \
         updated_at = NOW() \
         WHERE id = $4 RETURNING *",
    )
    .bind(payload.categoria.as_deref())
    .bind(payload.nome.as_deref().map(str::trim))
    .bind(payload.valor_planejado)
    .bind(item_id)
    .fetch_one(&state.db)
    .await
    .map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        item.grupo_id,
        &user,
        "item_atualizado",
        format!(
            "{} alterou \"{}\" de {} para {}",
            user.nome, atualizado.nome, item.valor_planejado, atualizado.valor_planejado
        ),
        json!({
            "item_id": item.id,
            "valor_anterior": item.valor_planejado,
            "valor_novo": atualizado.valor_planejado,
            "categoria_anterior": item.categoria,
            "categoria_nova": atualizado.categoria,
        }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Item atualizado!",
        "data": atualizado
    })))
}

pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> ApiResult {
    let item = sqlx::query_as::<_, ItemOrcamento>("SELECT * FROM orcamento_itens WHERE id = $1")
        .bind(item_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    let item = match item {
        Some(i) => i,
        None => return Err(erro_nao_encontrado("Item não encontrado.")),
    };

    if item.criado_por != user.id {
        return Err(erro_proibido("Apenas o autor pode excluir este item."));
    }

    sqlx::query("DELETE FROM orcamento_itens WHERE id = $1")
        .bind(item_id)
        .execute(&state.db)
        .await
        .map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        item.grupo_id,
        &user,
        "item_excluido",
        format!(
            "{} removeu \"{}\" ({}) de {}",
            user.nome, item.nome, item.categoria, item.valor_planejado
        ),
        json!({
            "item_id": item.id,
            "categoria": item.categoria,
            "valor_planejado": item.valor_planejado,
        }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Item excluído."
    })))
}
