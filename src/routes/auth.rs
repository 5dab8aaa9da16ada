use axum::extract::{Path, State};
use axum::response::Json;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{
    emitir_access_token, gerar_token_opaco, hash_senha, hash_token, verificar_senha, AuthUser,
};
use crate::database::Database;
use crate::errors::{
    erro_campo, erro_conflito, erro_interno, erro_nao_autorizado, erro_validacao, ApiResult,
    ErroApi,
};
use crate::models::token::{TokenGuardado, TIPO_REFRESH, TIPO_RESET_SENHA};
use crate::models::user::{
    ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, ResetPasswordRequest,
    User,
};
use crate::AppState;

// Emite access token + refresh token novos e guarda o hash do refresh.
async fn emitir_par_de_tokens(
    db: &Database,
    config: &crate::config::Config,
    user: &User,
) -> Result<(String, String), ErroApi> {
    let access_token =
        emitir_access_token(user.id, &user.nome, config).map_err(erro_interno)?;

    let refresh_token = gerar_token_opaco();
    let expires_at = Utc::now() + Duration::seconds(config.refresh_token_ttl_secs);

    sqlx::query(
        "INSERT INTO tokens (id, token_hash, tipo, user_id, expires_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(hash_token(&refresh_token))
    .bind(TIPO_REFRESH)
    .bind(user.id)
    .bind(expires_at)
    .execute(db)
    .await
    .map_err(erro_interno)?;

    Ok((access_token, refresh_token))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult {
    // Valida entrada
    let mut erros = Vec::new();
    if payload.nome.trim().is_empty() {
        erros.push(erro_campo("nome", "Nome é obrigatório."));
    }
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        erros.push(erro_campo("email", "E-mail inválido."));
    }
    if payload.senha.len() < 6 {
        erros.push(erro_campo("senha", "Senha deve ter pelo menos 6 caracteres."));
    }
    if !erros.is_empty() {
        return Err(erro_validacao("Dados inválidos.", erros));
    }

    let email = payload.email.trim().to_lowercase();

    // Verifica se o e-mail já está cadastrado
    let existente = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    if existente.is_some() {
        return Err(erro_conflito("E-mail já cadastrado."));
    }

    let senha_hash = hash_senha(&payload.senha).map_err(erro_interno)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, nome, email, senha_hash) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.nome.trim())
    .bind(&email)
    .bind(&senha_hash)
    .fetch_one(&state.db)
    .await
    .map_err(erro_interno)?;

    let (access_token, refresh_token) =
        emitir_par_de_tokens(&state.db, &state.config, &user).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Conta criada com sucesso!",
        "data": {
            "user": user,
            "access_token": access_token,
            "refresh_token": refresh_token
        }
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult {
    if payload.email.trim().is_empty() || payload.senha.is_empty() {
        return Err(erro_validacao(
            "E-mail e senha são obrigatórios.",
            vec![],
        ));
    }

    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    // Mesma resposta para e-mail inexistente e senha errada
    let user = match user {
        Some(user) => user,
        None => return Err(erro_nao_autorizado("E-mail ou senha incorretos.")),
    };

    if !verificar_senha(&payload.senha, &user.senha_hash).map_err(erro_interno)? {
        return Err(erro_nao_autorizado("E-mail ou senha incorretos."));
    }

    let (access_token, refresh_token) =
        emitir_par_de_tokens(&state.db, &state.config, &user).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login realizado!",
        "data": {
            "user": user,
            "access_token": access_token,
            "refresh_token": refresh_token
        }
    })))
}

// Rotação: o refresh apresentado é apagado e um par novo é emitido.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult {
    let token_hash = hash_token(&payload.refresh_token);

    let guardado = sqlx::query_as::<_, TokenGuardado>(
        "SELECT * FROM tokens WHERE token_hash = $1 AND tipo = $2",
    )
    .bind(&token_hash)
    .bind(TIPO_REFRESH)
    .fetch_optional(&state.db)
    .await
    .map_err(erro_interno)?;

    let guardado = match guardado {
        Some(t) => t,
        None => return Err(erro_nao_autorizado("Refresh token inválido.")),
    };

    if guardado.expires_at < Utc::now() {
        // Token vencido não serve mais para nada
        sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(guardado.id)
            .execute(&state.db)
            .await
            .map_err(erro_interno)?;
        return Err(erro_nao_autorizado("Refresh token expirado."));
    }

    let user_id = match guardado.user_id {
        Some(id) => id,
        None => return Err(erro_nao_autorizado("Refresh token inválido.")),
    };

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    let user = match user {
        Some(user) => user,
        None => return Err(erro_nao_autorizado("Refresh token inválido.")),
    };

    sqlx::query("DELETE FROM tokens WHERE id = $1")
        .bind(guardado.id)
        .execute(&state.db)
        .await
        .map_err(erro_interno)?;

    let (access_token, refresh_token) =
        emitir_par_de_tokens(&state.db, &state.config, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "access_token": access_token,
            "refresh_token": refresh_token
        }
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult {
    sqlx::query("DELETE FROM tokens WHERE token_hash = $1 AND tipo = $2 AND user_id = $3")
        .bind(hash_token(&payload.refresh_token))
        .bind(TIPO_REFRESH)
        .bind(user.id)
        .execute(&state.db)
        .await
        .map_err(erro_interno)?;

    Ok(Json(json!({
        "success": true,
        "message": "Sessão encerrada."
    })))
}

// Resposta idêntica exista o e-mail ou não, para não revelar cadastros.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult {
    let resposta = Ok(Json(json!({
        "success": true,
        "message": "Se o e-mail estiver cadastrado, enviaremos as instruções de redefinição."
    })));

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return resposta;
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(erro_interno)?;

    let user = match user {
        Some(user) => user,
        None => return resposta,
    };

    // Invalida pedidos anteriores antes de emitir um novo
    sqlx::query("DELETE FROM tokens WHERE user_id = $1 AND tipo = $2")
        .bind(user.id)
        .bind(TIPO_RESET_SENHA)
        .execute(&state.db)
        .await
        .map_err(erro_interno)?;

    let token = gerar_token_opaco();
    let expires_at = Utc::now() + Duration::seconds(state.config.reset_token_ttl_secs);

    sqlx::query(
        "INSERT INTO tokens (id, token_hash, tipo, user_id, email, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(hash_token(&token))
    .bind(TIPO_RESET_SENHA)
    .bind(user.id)
    .bind(&email)
    .bind(expires_at)
    .execute(&state.db)
    .await
    .map_err(erro_interno)?;

    // Entrega de e-mail ainda não integrada; o link sai no log do servidor.
    tracing::info!(
        email = %email,
        "redefinição de senha solicitada: /auth/reset-password/{}",
        token
    );

    resposta
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult {
    if payload.senha.len() < 6 {
        return Err(erro_validacao(
            "Dados inválidos.",
            vec![erro_campo("senha", "Senha deve ter pelo menos 6 caracteres.")],
        ));
    }

    let guardado = sqlx::query_as::<_, TokenGuardado>(
        "SELECT * FROM tokens WHERE token_hash = $1 AND tipo = $2",
    )
    .bind(hash_token(&token))
    .bind(TIPO_RESET_SENHA)
    .fetch_optional(&state.db)
    .await
    .map_err(erro_interno)?;

    let guardado = match guardado {
        Some(t) if t.expires_at >= Utc::now() => t,
        _ => {
            return Err(erro_validacao(
                "Token de redefinição inválido ou expirado.",
                vec![],
            ))
        }
    };

    let user_id = match guardado.user_id {
        Some(id) => id,
        None => {
            return Err(erro_validacao(
                "Token de redefinição inválido ou expirado.",
                vec![],
            ))
        }
    };

    let senha_hash = hash_senha(&payload.senha).map_err(erro_interno)?;

    let mut tx = state.db.begin().await.map_err(erro_interno)?;

    sqlx::query("UPDATE users SET senha_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&senha_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    // Token é de uso único, e as sessões antigas caem junto com a senha
    sqlx::query("DELETE FROM tokens WHERE id = $1")
        .bind(guardado.id)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    sqlx::query("DELETE FROM tokens WHERE user_id = $1 AND tipo = $2")
        .bind(user_id)
        .bind(TIPO_REFRESH)
        .execute(&mut *tx)
        .await
        .map_err(erro_interno)?;

    tx.commit().await.map_err(erro_interno)?;

    Ok(Json(json!({
        "success": true,
        "message": "Senha redefinida com sucesso!"
    })))
}
