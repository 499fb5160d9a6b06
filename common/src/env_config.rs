use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server: database connection
/// details, JWT configuration, server host and port, number of worker
/// threads, CORS settings, logging preferences, the entitlement-gate
/// settings and the tutor-provider client configuration.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Server-wide request ceiling, applied before any per-user check.
    pub global_requests_per_second: u32,
    /// Settings for the per-user entitlement and rate-limiting gate.
    pub gate: GateConfig,
    /// Settings for the conversational AI provider.
    pub tutor: TutorConfig,
}

#[derive(Clone, Debug)]
/// Per-user gate settings: sliding-window quota, conversation depth and
/// the plan tier the AI tutor is gated at.
pub struct GateConfig {
    /// Maximum tutor requests per user inside the trailing 60-second window.
    pub requests_per_minute: u32,
    /// Maximum conversation turns retained per user as model context.
    pub history_max_turns: usize,
    /// Plan tier required for the AI tutor ("free", "premium" or "pro").
    pub required_plan: String,
}

#[derive(Clone, Debug)]
/// Chat-completion provider client configuration (OpenAI-compatible API).
pub struct TutorConfig {
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer token for the provider.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// System prompt prepended to every conversation.
    pub system_prompt: String,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// # Panics
    ///
    /// This function will panic if:
    /// - `JWT_SECRET` environment variable is not set
    /// - `JWT_EXPIRATION_HOURS` is set but cannot be parsed as a valid number
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: "development" or "production"
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for JWT signing (via `JwtConfig::from_env()`)
    /// - `TUTOR_API_KEY`: Bearer token for the chat-completion provider
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `GLOBAL_REQUESTS_PER_SECOND`: Server-wide ceiling (default: 10)
    /// - `RATE_LIMIT_PER_MINUTE`: Per-user sliding-window quota (default: 10)
    /// - `HISTORY_MAX_TURNS`: Conversation window depth (default: 20)
    /// - `TUTOR_REQUIRED_PLAN`: Plan the tutor is gated at (default: "premium")
    /// - `TUTOR_API_URL`, `TUTOR_MODEL`, `TUTOR_SYSTEM_PROMPT`
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing
    /// or if numeric values cannot be parsed correctly.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            global_requests_per_second: env::var("GLOBAL_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("GLOBAL_REQUESTS_PER_SECOND must be a valid number"),
            gate: GateConfig {
                requests_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("RATE_LIMIT_PER_MINUTE must be a valid number"),
                history_max_turns: env::var("HISTORY_MAX_TURNS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("HISTORY_MAX_TURNS must be a valid number"),
                required_plan: env::var("TUTOR_REQUIRED_PLAN")
                    .unwrap_or_else(|_| "premium".to_string()),
            },
            tutor: TutorConfig {
                api_url: env::var("TUTOR_API_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
                api_key: env::var("TUTOR_API_KEY").expect("TUTOR_API_KEY must be set"),
                model: env::var("TUTOR_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                system_prompt: env::var("TUTOR_SYSTEM_PROMPT").unwrap_or_else(|_| {
                    "You are a patient tutor helping a student practice. \
                     Explain step by step and ask guiding questions."
                        .to_string()
                }),
            },
        })
    }
}
