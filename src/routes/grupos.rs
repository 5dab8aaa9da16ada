use axum::extract::{Path, State};
use axum::response::Json;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{gerar_token_opaco, hash_token, AuthUser};
use crate::database::Database;
use crate::errors::{
    erro_campo, erro_conflito, erro_interno, erro_nao_encontrado, erro_proibido, erro_validacao,
    ApiResult,
};
use crate::models::grupo::{
    ApelidoRequest, ConviteRequest, CreateGrupoRequest, Grupo, MembroComNome, PAPEL_ADMIN,
    PAPEL_MEMBRO,
};
use crate::models::token::{TokenGuardado, TIPO_CONVITE};
use crate::models::user::User;
use crate::routes::atividades::registrar_atividade;
use crate::AppState;

pub async fn buscar_grupo(db: &Database, grupo_id: Uuid) -> Result<Option<Grupo>, sqlx::Error> {
    sqlx::query_as::<_, Grupo>("SELECT * FROM grupos WHERE id = $1")
        .bind(grupo_id)
        .fetch_optional(db)
        .await
}

/// Varredura da lista de membros: o usuário pertence ao grupo?
pub async fn eh_membro(db: &Database, grupo_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM grupo_membros WHERE grupo_id = $1 AND user_id = $2)",
    )
    .bind(grupo_id)
    .bind(user_id)
    .fetch_one(db)
    .await
}

pub async fn eh_admin(db: &Database, grupo_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM grupo_membros \
         WHERE grupo_id = $1 AND user_id = $2 AND papel = $3)",
    )
    .bind(grupo_id)
    .bind(user_id)
    .bind(PAPEL_ADMIN)
    .fetch_one(db)
    .await
}

pub async fn create_grupo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateGrupoRequest>,
) -> ApiResult {
    if payload.nome.trim().is_empty() {
        return Err(erro_validacao(
            "Dados inválidos.",
            vec![erro_campo("nome", "Nome do grupo é obrigatório.")],
        ));
    }

    let grupo_id = Uuid::new_v4();

    // Grupo e vínculo do criador nascem juntos
    let mut tx = state.db.begin().await.map_err(erro_interno)?;

    let grupo = sqlx::query_as::<_, Grupo>(
        "INSERT INTO grupos (id, nome, criado_por) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(grupo_id)
    .bind(payload.nome.trim())
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(erro_interno)?;

    sqlx::query(
        "INSERT INTO grupo_membros (id, grupo_id, user_id, papel) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(grupo_id)
    .bind(user.id)
    .bind(PAPEL_ADMIN)
    .execute(&mut *tx)
    .await
    .map_err(erro_interno)?;

    tx.commit().await.map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        grupo_id,
        &user,
        "grupo_criado",
        format!("{} criou o grupo \"{}\"", user.nome, grupo.nome),
        json!({ "nome": grupo.nome }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Grupo criado com sucesso!",
        "data": grupo
    })))
}

// Grupos do usuário autenticado, com membros e o apelido local de cada um.
pub async fn get_grupos(State(state): State<AppState>, user: AuthUser) -> ApiResult {
    let grupos = sqlx::query_as::<_, Grupo>(
        "SELECT g.* FROM grupos g \
         JOIN grupo_membros m ON m.grupo_id = g.id \
         WHERE m.user_id = $1 \
         ORDER BY g.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await
    .map_err(erro_interno)?;

    let ids: Vec<Uuid> = grupos.iter().map(|g| g.id).collect();

    let membros = sqlx::query_as::<_, MembroComNome>(
        "SELECT m.grupo_id AS grupo_id, m.user_id, u.nome, m.papel, m.apelido \
         FROM grupo_membros m \
         JOIN users u ON u.id = m.user_id \
         WHERE m.grupo_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&state.db)
    .await
    .map_err(erro_interno)?;

    let data: Vec<_> = grupos
        .iter()
        .map(|g| {
            let do_grupo: Vec<_> = membros.iter().filter(|m| m.grupo_id == g.id).collect();
            let meu_apelido = do_grupo
                .iter()
                .find(|m| m.user_id == user.id)
                .and_then(|m| m.apelido.clone());
            json!({
                "id": g.id,
                "nome": g.nome,
                "criado_por": g.criado_por,
                "created_at": g.created_at,
                "membros": do_grupo,
                "meu_apelido": meu_apelido,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": data
    })))
}

pub async fn invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(grupo_id): Path<Uuid>,
    Json(payload): Json<ConviteRequest>,
) -> ApiResult {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(erro_validacao(
            "Dados inválidos.",
            vec![erro_campo("email", "E-mail inválido.")],
        ));
    }

    let grupo = match buscar_grupo(&state.db, grupo_id).await.map_err(erro_interno)? {
        Some(g) => g,
        None => return Err(erro_nao_encontrado("Grupo não encontrado.")),
    };

    // Somente administradores convidam
    if !eh_admin(&state.db, grupo_id, user.id)
        .await
        .map_err(erro_interno)?
    {
        return Err(erro_proibido(
            "Apenas administradores do grupo podem enviar convites.",
        ));
    }

    // Convite anterior pendente para o mesmo e-mail é substituído
    sqlx::query("DELETE FROM tokens WHERE grupo_id = $1 AND email = $2 AND tipo = $3")
        .bind(grupo_id)
        .bind(&email)
        .bind(TIPO_CONVITE)
        .execute(&state.db)
        .await
        .map_err(erro_interno)?;

    let token = gerar_token_opaco();
    let expires_at = Utc::now() + Duration::seconds(state.config.convite_ttl_secs);

    sqlx::query(
        "INSERT INTO tokens (id, token_hash, tipo, grupo_id, email, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(hash_token(&token))
    .bind(TIPO_CONVITE)
    .bind(grupo_id)
    .bind(&email)
    .bind(expires_at)
    .execute(&state.db)
    .await
    .map_err(erro_interno)?;

    // Entrega de e-mail ainda não integrada; o link sai no log do servidor.
    tracing::info!(
        email = %email,
        grupo = %grupo.nome,
        "convite emitido: /groups/accept-invite/{}",
        token
    );

    registrar_atividade(
        &state.db,
        grupo_id,
        &user,
        "convite_enviado",
        format!("{} convidou {} para o grupo", user.nome, email),
        json!({ "email": email }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Convite enviado!"
    })))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(token): Path<String>,
) -> ApiResult {
    let guardado = sqlx::query_as::<_, TokenGuardado>(
        "SELECT * FROM tokens WHERE token_hash = $1 AND tipo = $2",
    )
    .bind(hash_token(&token))
    .bind(TIPO_CONVITE)
    .fetch_optional(&state.db)
    .await
    .map_err(erro_interno)?;

    let guardado = match guardado {
        Some(t) if t.expires_at >= Utc::now() => t,
        _ => return Err(erro_validacao("Convite inválido ou expirado.", vec![])),
    };

    let grupo_id = match guardado.grupo_id {
        Some(id) => id,
        None => return Err(erro_validacao("Convite inválido ou expirado.", vec![])),
    };

    // O convite vale para o e-mail convidado, não para quem achou o link
    let eu = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&state.db)
        .await
        .map_err(erro_interno)?;

    if guardado.email.as_deref() != Some(eu.email.as_str()) {
        return Err(erro_proibido("Este convite foi enviado para outro e-mail."));
    }

    let grupo = match buscar_grupo(&state.db, grupo_id).await.map_err(erro_interno)? {
        Some(g) => g,
        None => return Err(erro_nao_encontrado("Grupo não encontrado.")),
    };

    if eh_membro(&state.db, grupo_id, user.id)
        .await
        .map_err(erro_interno)?
    {
        return Err(erro_conflito("Você já é membro deste grupo."));
    }

    let mut tx = state.db.begin().await.map_err(erro_interno)?;

    sqlx::query(
        "INSERT INTO grupo_membros (id, grupo_id, user_id, papel) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(grupo_id)
    .bind(user.id)
    .bind(PAPEL_MEMBRO)
    .execute(&mut *tx)
    .await
    .map_err(erro_interno)?;

    // Uso único
    sqlx::query("DELETE FROM tokens WHERE id = $1")
        .bind(guardado.id)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    tx.commit().await.map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        grupo_id,
        &user,
        "convite_aceito",
        format!("{} entrou no grupo \"{}\"", user.nome, grupo.nome),
        json!({}),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Convite aceito! Você agora é membro do grupo.",
        "data": grupo
    })))
}

// Define o apelido do PRÓPRIO usuário dentro do grupo.
pub async fn update_display_name(
    State(state): State<AppState>,
    user: AuthUser,
    Path(grupo_id): Path<Uuid>,
    Json(payload): Json<ApelidoRequest>,
) -> ApiResult {
    if payload.apelido.trim().is_empty() {
        return Err(erro_validacao(
            "Dados inválidos.",
            vec![erro_campo("apelido", "Apelido é obrigatório.")],
        ));
    }

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

    sqlx::query("UPDATE grupo_membros SET apelido = $1 WHERE grupo_id = $2 AND user_id = $3")
        .bind(payload.apelido.trim())
        .bind(grupo_id)
        .bind(user.id)
        .execute(&state.db)
        .await
        .map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        grupo_id,
        &user,
        "apelido_atualizado",
        format!("{} agora aparece como \"{}\"", user.nome, payload.apelido.trim()),
        json!({ "apelido": payload.apelido.trim() }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Apelido atualizado!"
    })))
}

// Remove o grupo e os vínculos; orçamentos, transações e atividades do
// grupo permanecem no banco (sem cascata).
pub async fn delete_grupo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(grupo_id): Path<Uuid>,
) -> ApiResult {
    let grupo = match buscar_grupo(&state.db, grupo_id).await.map_err(erro_interno)? {
        Some(g) => g,
        None => return Err(erro_nao_encontrado("Grupo não encontrado.")),
    };

    if grupo.criado_por != user.id {
        return Err(erro_proibido("Apenas o criador pode excluir o grupo."));
    }

    let mut tx = state.db.begin().await.map_err(erro_interno)?;

    sqlx::query("DELETE FROM tokens WHERE grupo_id = $1 AND tipo = $2")
        .bind(grupo_id)
        .bind(TIPO_CONVITE)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    sqlx::query("DELETE FROM grupo_membros WHERE grupo_id = $1")
        .bind(grupo_id)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    sqlx::query("DELETE FROM grupos WHERE id = $1")
        .bind(grupo_id)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    tx.commit().await.map_err(erro_interno)?;

    registrar_atividade(
        &state.db,
        grupo_id,
        &user,
        "grupo_excluido",
        format!("{} excluiu o grupo \"{}\"", user.nome, grupo.nome),
        json!({ "nome": grupo.nome }),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Grupo excluído."
    })))
}
