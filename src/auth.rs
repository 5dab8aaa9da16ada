use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{erro_nao_autorizado, ErroApi};
use crate::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expirado")]
    TokenExpirado,

    #[error("token inválido: {0}")]
    TokenInvalido(String),

    #[error("erro de criptografia: {0}")]
    Crypto(String),
}

/// Claims do access token (JWT HS256, sem estado no servidor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// ID do usuário (UUID em string).
    pub sub: String,
    /// Nome do usuário, para exibição sem nova consulta.
    pub nome: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn emitir_access_token(
    user_id: Uuid,
    nome: &str,
    config: &Config,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        nome: nome.to_string(),
        iat: now,
        exp: now + config.access_token_ttl_secs,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("falha ao assinar JWT: {e}")))
}

pub fn decodificar_access_token(token: &str, jwt_secret: &str) -> Result<Claims, AuthError> {
    let key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpirado,
            _ => AuthError::TokenInvalido(e.to_string()),
        })
}

/// Gera um token opaco aleatório (32 bytes, base64url sem padding).
/// Usado para refresh tokens, redefinição de senha e convites.
pub fn gerar_token_opaco() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 do token opaco, em hex. É o valor que vai para o banco;
/// o token em claro só aparece na resposta/link enviado ao usuário.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hash_senha(senha: &str) -> Result<String, AuthError> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(senha.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Crypto(format!("falha ao gerar hash: {e}")))
}

pub fn verificar_senha(senha: &str, hash: &str) -> Result<bool, AuthError> {
    use argon2::{Argon2, PasswordVerifier};

    let parsed = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("hash armazenado inválido: {e}")))?;

    match Argon2::default().verify_password(senha.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("falha na verificação: {e}"))),
    }
}

/// Usuário autenticado, extraído do header `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub nome: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ErroApi;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| erro_nao_autorizado("Token de acesso ausente."))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| erro_nao_autorizado("Token de acesso ausente."))?;

        let claims =
            decodificar_access_token(token, &state.config.jwt_secret).map_err(|e| match e {
                AuthError::TokenExpirado => erro_nao_autorizado("Token de acesso expirado."),
                _ => erro_nao_autorizado("Token de acesso inválido."),
            })?;

        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| erro_nao_autorizado("Token de acesso inválido."))?;

        Ok(AuthUser {
            id,
            nome: claims.nome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/teste".into(),
            bind_addr: "127.0.0.1:0".into(),
            jwt_secret: "segredo-de-teste".into(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 2_592_000,
            reset_token_ttl_secs: 3600,
            convite_ttl_secs: 604_800,
        }
    }

    #[test]
    fn jwt_ida_e_volta() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let token = emitir_access_token(user_id, "Ana", &config).unwrap();
        let claims = decodificar_access_token(&token, &config.jwt_secret).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.nome, "Ana");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn jwt_com_segredo_errado_rejeitado() {
        let config = test_config();
        let token = emitir_access_token(Uuid::new_v4(), "Ana", &config).unwrap();

        let result = decodificar_access_token(&token, "outro-segredo");
        assert!(matches!(result, Err(AuthError::TokenInvalido(_))));
    }

    #[test]
    fn jwt_expirado_rejeitado() {
        let mut config = test_config();
        // Emite já vencido; o leeway padrão do jsonwebtoken é 60s.
        config.access_token_ttl_secs = -120;
        let token = emitir_access_token(Uuid::new_v4(), "Ana", &config).unwrap();

        let result = decodificar_access_token(&token, &config.jwt_secret);
        assert!(matches!(result, Err(AuthError::TokenExpirado)));
    }

    #[test]
    fn token_opaco_e_url_safe() {
        let token = gerar_token_opaco();
        assert_eq!(token.len(), 43); // 32 bytes -> 43 chars base64url
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn hash_de_token_e_deterministico() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn senha_ida_e_volta() {
        let hash = hash_senha("hunter2").unwrap();
        assert!(verificar_senha("hunter2", &hash).unwrap());
        assert!(!verificar_senha("errada", &hash).unwrap());
    }

    #[test]
    fn hash_de_senha_malformado_da_erro() {
        assert!(verificar_senha("x", "nao-e-um-hash").is_err());
    }
}
