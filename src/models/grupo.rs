use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grupo {
    pub id: Uuid,
    pub nome: String,
    pub criado_por: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Linha de membro com o nome do usuário, para listagens. `apelido` é o
/// nome de exibição que o próprio membro escolheu para este grupo; não é
/// compartilhado com os demais.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MembroComNome {
    pub grupo_id: Uuid,
    pub user_id: Uuid,
    pub nome: String,
    pub papel: String,
    pub apelido: Option<String>,
}

pub const PAPEL_ADMIN: &str = "admin";
pub const PAPEL_MEMBRO: &str = "membro";

#[derive(Debug, Deserialize)]
pub struct CreateGrupoRequest {
    pub nome: String,
}

#[derive(Debug, Deserialize)]
pub struct ConviteRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ApelidoRequest {
    pub apelido: String,
}
