use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// As quatro categorias fixas de itens planejados e transações.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Categoria {
    Renda,
    Despesa,
    Conta,
    Poupanca,
}

impl Categoria {
    pub const TODAS: [Categoria; 4] = [
        Categoria::Renda,
        Categoria::Despesa,
        Categoria::Conta,
        Categoria::Poupanca,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Categoria::Renda => "renda",
            Categoria::Despesa => "despesa",
            Categoria::Conta => "conta",
            Categoria::Poupanca => "poupanca",
        }
    }

    pub fn parse(s: &str) -> Option<Categoria> {
        match s {
            "renda" => Some(Categoria::Renda),
            "despesa" => Some(Categoria::Despesa),
            "conta" => Some(Categoria::Conta),
            "poupanca" => Some(Categoria::Poupanca),
            _ => None,
        }
    }
}

/// Item planejado ("envelope") de um orçamento. `grupo_id` é redundante
/// com o orçamento, mantido para consultas diretas por grupo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ItemOrcamento {
    pub id: Uuid,
    pub orcamento_id: Uuid,
    pub grupo_id: Uuid,
    pub categoria: String,
    pub nome: String,
    pub valor_planejado: Decimal,
    pub criado_por: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub orcamento_id: Uuid,
    pub categoria: String,
    pub nome: String,
    pub valor_planejado: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub categoria: Option<String>,
    pub nome: Option<String>,
    pub valor_planejado: Option<Decimal>,
}

/// Itens de uma categoria com a soma dos valores planejados.
#[derive(Debug, Serialize)]
pub struct ResumoCategoria {
    pub categoria: &'static str,
    pub itens: Vec<ItemOrcamento>,
    pub total: Decimal,
}

/// Particiona os itens pelas quatro categorias e soma os valores de cada
/// uma. Sempre devolve as quatro, mesmo vazias, na ordem fixa.
pub fn particionar_por_categoria(itens: Vec<ItemOrcamento>) -> Vec<ResumoCategoria> {
    let mut resumos: Vec<ResumoCategoria> = Categoria::TODAS
        .iter()
        .map(|c| ResumoCategoria {
            categoria: c.as_str(),
            itens: Vec::new(),
            total: Decimal::ZERO,
        })
        .collect();

    for item in itens {
        if let Some(pos) = Categoria::TODAS
            .iter()
            .position(|c| c.as_str() == item.categoria)
        {
            resumos[pos].total += item.valor_planejado;
            resumos[pos].itens.push(item);
        }
    }

    resumos
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_aceita_as_quatro_categorias() {
        for c in Categoria::TODAS {
            assert_eq!(Categoria::parse(c.as_str()), Some(c));
        }
    }

    #[test]
    fn parse_rejeita_outros_valores() {
        assert_eq!(Categoria::parse("investimento"), None);
        assert_eq!(Categoria::parse("Renda"), None);
        assert_eq!(Categoria::parse(""), None);
    }

    fn item(categoria: &str, valor: Decimal) -> ItemOrcamento {
        ItemOrcamento {
            id: Uuid::new_v4(),
            orcamento_id: Uuid::new_v4(),
            grupo_id: Uuid::new_v4(),
            categoria: categoria.to_string(),
            nome: "Item".to_string(),
            valor_planejado: valor,
            criado_por: Uuid::new_v4(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn particao_soma_por_categoria_sem_arredondamento() {
        let itens = vec![
            item("despesa", dec!(1200.00)),
            item("despesa", dec!(0.10)),
            item("despesa", dec!(0.20)),
            item("renda", dec!(3500.55)),
        ];

        let resumos = particionar_por_categoria(itens);
        assert_eq!(resumos.len(), 4);

        let despesa = resumos.iter().find(|r| r.categoria == "despesa").unwrap();
        assert_eq!(despesa.itens.len(), 3);
        assert_eq!(despesa.total, dec!(1200.30));

        let renda = resumos.iter().find(|r| r.categoria == "renda").unwrap();
        assert_eq!(renda.total, dec!(3500.55));
    }

    #[test]
    fn particao_devolve_categorias_vazias() {
        let resumos = particionar_por_categoria(vec![]);
        assert_eq!(resumos.len(), 4);
        for r in &resumos {
            assert!(r.itens.is_empty());
            assert_eq!(r.total, Decimal::ZERO);
        }
    }
}
