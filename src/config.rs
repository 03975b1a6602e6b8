use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    /// Minutes after a slot's scheduled start before a check-in counts late.
    pub grace_window_minutes: i64,
    /// Worked minutes beyond which a closed record is flagged overtime.
    pub overtime_threshold_minutes: i64,

    // Rate limiting
    pub rate_protected_per_min: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://fieldops.db".to_string()),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            grace_window_minutes: env::var("GRACE_WINDOW_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("GRACE_WINDOW_MINUTES must be an integer"),
            overtime_threshold_minutes: env::var("OVERTIME_THRESHOLD_MINUTES")
                .unwrap_or_else(|_| "480".to_string()) // 8-hour standard shift
                .parse()
                .expect("OVERTIME_THRESHOLD_MINUTES must be an integer"),

            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("RATE_PROTECTED_PER_MIN must be an integer"),
        }
    }
}
