use std::env;

/// Configuração carregada do ambiente na inicialização.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    /// Validade do access token em segundos.
    pub access_token_ttl_secs: i64,
    /// Validade do refresh token em segundos.
    pub refresh_token_ttl_secs: i64,
    /// Validade do token de redefinição de senha em segundos.
    pub reset_token_ttl_secs: i64,
    /// Validade do convite de grupo em segundos.
    pub convite_ttl_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL não definida".to_string())?;
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET não definida".to_string())?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

        Ok(Config {
            database_url,
            bind_addr,
            jwt_secret,
            access_token_ttl_secs: env_i64("ACCESS_TOKEN_TTL_SECS", 900),
            refresh_token_ttl_secs: env_i64("REFRESH_TOKEN_TTL_SECS", 30 * 24 * 3600),
            reset_token_ttl_secs: env_i64("RESET_TOKEN_TTL_SECS", 3600),
            convite_ttl_secs: env_i64("CONVITE_TTL_SECS", 7 * 24 * 3600),
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_i64_usa_default_quando_ausente() {
        assert_eq!(env_i64("VARIAVEL_QUE_NAO_EXISTE_XYZ", 42), 42);
    }
}
