use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Credencial transitória guardada apenas como hash: refresh token,
/// redefinição de senha ou convite de grupo. Apagada ao ser usada.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenGuardado {
    pub id: Uuid,
    pub token_hash: String,
    pub tipo: String,
    pub user_id: Option<Uuid>,
    pub grupo_id: Option<Uuid>,
    pub email: Option<String>,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

pub const TIPO_REFRESH: &str = "refresh";
pub const TIPO_RESET_SENHA: &str = "reset_senha";
pub const TIPO_CONVITE: &str = "convite";
