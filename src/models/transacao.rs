use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::item::Categoria;

pub const DESCRICAO_MAX: usize = 140;

/// Evento financeiro real de um grupo. Não referencia orçamento: o vínculo
/// com um período é feito apenas pela data, na leitura.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transacao {
    pub id: Uuid,
    pub grupo_id: Uuid,
    pub categoria: String,
    pub tipo: String,
    pub valor: Decimal,
    pub data: NaiveDate,
    pub descricao: Option<String>,
    pub criado_por: Uuid,
    /// Nome do autor, desnormalizado na criação. Não acompanha renomeações.
    pub criado_por_nome: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransacaoRequest {
    pub grupo_id: Uuid,
    pub categoria: String,
    pub tipo: String,
    pub valor: Decimal,
    pub data: String, // "YYYY-MM-DD"
    pub descricao: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransacaoRequest {
    pub categoria: Option<String>,
    pub tipo: Option<String>,
    pub valor: Option<Decimal>,
    pub data: Option<String>, // "YYYY-MM-DD"
    pub descricao: Option<String>,
}

/// Valida os campos de uma transação. Devolve a lista de erros de campo;
/// vazia quando os dados são aceitáveis.
pub fn validar_transacao(
    categoria: &str,
    tipo: &str,
    valor: Decimal,
    descricao: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut erros = Vec::new();

    if Categoria::parse(categoria).is_none() {
        erros.push((
            "categoria",
            "Categoria deve ser renda, despesa, conta ou poupanca.".to_string(),
        ));
    }

    if tipo.trim().is_empty() {
        erros.push(("tipo", "Tipo é obrigatório.".to_string()));
    }

    if valor <= Decimal::ZERO {
        erros.push(("valor", "Valor deve ser maior que zero.".to_string()));
    }

    if let Some(d) = descricao {
        if d.chars().count() > DESCRICAO_MAX {
            erros.push((
                "descricao",
                format!("Descrição deve ter no máximo {DESCRICAO_MAX} caracteres."),
            ));
        }
    }

    erros
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn transacao_valida_passa() {
        let erros = validar_transacao("despesa", "Aluguel", dec!(1200.00), Some("Abril"));
        assert!(erros.is_empty());
    }

    #[test]
    fn valor_zero_ou_negativo_rejeitado() {
        let erros = validar_transacao("despesa", "Aluguel", dec!(0), None);
        assert!(erros.iter().any(|(campo, _)| *campo == "valor"));

        let erros = validar_transacao("despesa", "Aluguel", dec!(-5.00), None);
        assert!(erros.iter().any(|(campo, _)| *campo == "valor"));
    }

    #[test]
    fn categoria_desconhecida_rejeitada() {
        let erros = validar_transacao("lazer", "Cinema", dec!(30.00), None);
        assert!(erros.iter().any(|(campo, _)| *campo == "categoria"));
    }

    #[test]
    fn tipo_vazio_rejeitado() {
        let erros = validar_transacao("conta", "   ", dec!(99.90), None);
        assert!(erros.iter().any(|(campo, _)| *campo == "tipo"));
    }

    #[test]
    fn descricao_no_limite_passa_e_acima_falha() {
        let no_limite = "a".repeat(DESCRICAO_MAX);
        assert!(validar_transacao("renda", "Salário", dec!(1.00), Some(&no_limite)).is_empty());

        let acima = "a".repeat(DESCRICAO_MAX + 1);
        let erros = validar_transacao("renda", "Salário", dec!(1.00), Some(&acima));
        assert!(erros.iter().any(|(campo, _)| *campo == "descricao"));
    }
}
