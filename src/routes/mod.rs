pub mod atividades;
pub mod auth;
pub mod grupos;
pub mod itens;
pub mod orcamentos;
pub mod transacoes;
