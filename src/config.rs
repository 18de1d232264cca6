use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub verify_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_base_url: String,
    pub api_token: String,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public base URL embedded into verification links sent by email.
    pub server_host: String,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let server_host =
            std::env::var("SERVER_HOST").unwrap_or_else(|_| "http://localhost:8080".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "formfixer".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "formfixer-users".into()),
            access_ttl_minutes: env_i64("JWT_TTL_MINUTES", 60),
            verify_ttl_minutes: env_i64("JWT_VERIFY_TTL_MINUTES", 60),
            reset_ttl_minutes: env_i64("JWT_RESET_TTL_MINUTES", 15),
        };
        let email = EmailConfig {
            api_base_url: std::env::var("EMAIL_API_BASE_URL")?,
            api_token: std::env::var("EMAIL_API_TOKEN")?,
            sender: std::env::var("EMAIL_SENDER")?,
        };
        Ok(Self {
            database_url,
            server_host,
            jwt,
            email,
            minio_endpoint: std::env::var("MINIO_ENDPOINT")?,
            minio_bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "formfixer".into()),
            minio_access_key: std::env::var("MINIO_ACCESS_KEY")?,
            minio_secret_key: std::env::var("MINIO_SECRET_KEY")?,
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}
