use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared immutably through the application state (pulled into handlers via FromRef),
/// so every component sees the same values for the lifetime of the process.
#[derive(Clone)]
pub struct AppConfig {
    // MongoDB connection string.
    pub mongo_uri: String,
    // Name of the database holding the `register` and `subjects` collections.
    pub db_name: String,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // Secret used to sign and validate bearer tokens (HS256).
    pub jwt_secret: String,
    // Runtime environment marker. Controls log format selection.
    pub env: Env,
}

/// Env
///
/// Runtime context switch between development conveniences (pretty logs, fallback
/// secret) and production requirements (JSON logs, mandatory secrets).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Provides a safe, non-panicking AppConfig primarily used for test setup, so
    /// tests can build application state without touching environment variables.
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            db_name: "subject_registry_test".to_string(),
            port: 3000,
            jwt_secret: "local-test-signing-secret".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// The canonical startup configuration loader. Reads all parameters from
    /// environment variables and fails fast on anything missing that production
    /// cannot run without.
    ///
    /// # Panics
    /// Panics if `MONGO_URI` is unset, or if `JWT_SECRET` is unset in production.
    /// Starting with an incomplete configuration is worse than not starting.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // The signing secret is mandatory in production. Local gets a fallback so
        // the service can be run straight from a fresh checkout.
        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            _ => env::var("JWT_SECRET")
                .unwrap_or_else(|_| "local-test-signing-secret".to_string()),
        };

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            mongo_uri: env::var("MONGO_URI").expect("FATAL: MONGO_URI required"),
            db_name: env::var("DB_NAME").unwrap_or_else(|_| "subject_registry".to_string()),
            port,
            jwt_secret,
            env,
        }
    }
}
