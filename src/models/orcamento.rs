use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Período de orçamento de um grupo. Por convenção, um mês-calendário
/// (primeiro ao último dia).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Orcamento {
    pub id: Uuid,
    pub grupo_id: Uuid,
    pub data_inicio: NaiveDate,
    pub data_fim: NaiveDate,
    pub criado_por: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrcamentoRequest {
    pub grupo_id: Uuid,
    pub data_inicio: String, // "YYYY-MM-DD"
    pub data_fim: String,    // "YYYY-MM-DD"
}

/// Último dia de um mês, via "dia 0 do mês seguinte".
pub fn ultimo_dia_do_mes(ano: i32, mes: u32) -> NaiveDate {
    let (prox_ano, prox_mes) = if mes == 12 { (ano + 1, 1) } else { (ano, mes + 1) };
    NaiveDate::from_ymd_opt(prox_ano, prox_mes, 1).unwrap() - Duration::days(1)
}

/// Limites do mês-calendário imediatamente anterior ao início informado.
/// O início é normalizado para o dia 1; a virada de ano (janeiro ->
/// dezembro do ano anterior) é tratada.
pub fn mes_anterior(data_inicio: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (ano, mes) = if data_inicio.month() == 1 {
        (data_inicio.year() - 1, 12)
    } else {
        (data_inicio.year(), data_inicio.month() - 1)
    };

    let inicio = NaiveDate::from_ymd_opt(ano, mes, 1).unwrap();
    (inicio, ultimo_dia_do_mes(ano, mes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(ano: i32, mes: u32, dia: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(ano, mes, dia).unwrap()
    }

    #[test]
    fn ultimo_dia_meses_comuns() {
        assert_eq!(ultimo_dia_do_mes(2024, 4), d(2024, 4, 30));
        assert_eq!(ultimo_dia_do_mes(2024, 12), d(2024, 12, 31));
    }

    #[test]
    fn ultimo_dia_fevereiro_bissexto() {
        assert_eq!(ultimo_dia_do_mes(2024, 2), d(2024, 2, 29));
        assert_eq!(ultimo_dia_do_mes(2023, 2), d(2023, 2, 28));
    }

    #[test]
    fn mes_anterior_no_meio_do_ano() {
        let (inicio, fim) = mes_anterior(d(2024, 4, 1));
        assert_eq!(inicio, d(2024, 3, 1));
        assert_eq!(fim, d(2024, 3, 31));
    }

    #[test]
    fn mes_anterior_vira_o_ano() {
        let (inicio, fim) = mes_anterior(d(2024, 1, 1));
        assert_eq!(inicio, d(2023, 12, 1));
        assert_eq!(fim, d(2023, 12, 31));
    }

    #[test]
    fn mes_anterior_normaliza_para_o_dia_1() {
        // Mesmo que o período comece fora do dia 1, o mês anterior é
        // sempre o mês-calendário cheio.
        let (inicio, fim) = mes_anterior(d(2024, 3, 15));
        assert_eq!(inicio, d(2024, 2, 1));
        assert_eq!(fim, d(2024, 2, 29));
    }
}
