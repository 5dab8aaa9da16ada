use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Entrada do registro de atividades de um grupo. Escrita uma única vez;
/// nunca é atualizada ou removida pela aplicação.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Atividade {
    pub id: Uuid,
    pub grupo_id: Uuid,
    pub user_id: Uuid,
    /// Nome do autor na hora do evento, desnormalizado.
    pub user_nome: String,
    pub acao: String,
    pub descricao: String,
    pub detalhes: Value,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AtividadeQuery {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}
