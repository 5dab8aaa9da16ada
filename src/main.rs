use axum::{
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use dotenvy::dotenv;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod database;
mod errors;
mod models;
mod routes;

use config::Config;
use database::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

#[tokio::main]
async fn main() {
    // Carrega o ambiente do arquivo .env
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().expect("configuração inválida");

    // Pool de conexões e migrações
    let db = database::create_database_connection(&config.database_url)
        .await
        .expect("falha ao conectar no PostgreSQL");

    database::run_migrations(&db)
        .await
        .expect("falha ao executar as migrações");

    // CORS para o frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    async fn handle_404() -> (StatusCode, Json<Value>) {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": "not_found",
                "message": "Rota não encontrada."
            })),
        )
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState { db, config };

    // Rotas da API
    let app = Router::new()
        // Autenticação
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/refresh-token", post(routes::auth::refresh_token))
        .route("/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/auth/reset-password/:token", post(routes::auth::reset_password))
        // Grupos
        .route("/groups", post(routes::grupos::create_grupo).get(routes::grupos::get_grupos))
        .route("/groups/:id/invite", post(routes::grupos::invite))
        .route("/groups/accept-invite/:token", post(routes::grupos::accept_invite))
        .route("/groups/:id/display-name", put(routes::grupos::update_display_name))
        .route("/groups/:id", delete(routes::grupos::delete_grupo))
        // Orçamentos
        .route("/budgets", post(routes::orcamentos::create_orcamento))
        .route("/budgets/group/:grupo_id", get(routes::orcamentos::get_orcamentos_grupo))
        .route(
            "/budgets/:id",
            get(routes::orcamentos::get_orcamento_by_id).delete(routes::orcamentos::delete_orcamento),
        )
        // Itens planejados
        .route("/budget-items", post(routes::itens::create_item))
        .route("/budget-items/budget/:id", get(routes::itens::get_itens_orcamento))
        .route(
            "/budget-items/:id",
            put(routes::itens::update_item).delete(routes::itens::delete_item),
        )
        // Transações
        .route("/transactions", post(routes::transacoes::create_transacao))
        .route("/transactions/group/:id", get(routes::transacoes::get_transacoes_grupo))
        .route(
            "/transactions/:id",
            get(routes::transacoes::get_transacao_by_id)
                .put(routes::transacoes::update_transacao)
                .delete(routes::transacoes::delete_transacao),
        )
        // Atividades
        .route("/activities/group/:id", get(routes::atividades::get_atividades_grupo))
        // 404 em JSON
        .fallback(handle_404)
        .with_state(state)
        .layer(cors);

    info!("Servidor ouvindo em http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("falha ao abrir a porta");

    axum::serve(listener, app).await.expect("falha no servidor");
}
