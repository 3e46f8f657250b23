use super::parsing::{
    env_optional, env_or_default, is_supported_upload_extension, normalize_prefix,
    parse_ai_provider, parse_bool, parse_cors_origins, parse_environment, parse_string_list,
    parse_u16, parse_u32, parse_u64,
};
use super::types::{
    AiSettings, ApiSettings, AuthSettings, ConfigError, CorsSettings, DatabaseSettings,
    GradingSettings, RedisSettings, RuntimeSettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings, UploadSettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("GRADER_HOST", "0.0.0.0");
        let port = env_optional("GRADER_PORT")
            .or_else(|| env_optional("PORT"))
            .unwrap_or_else(|| "3000".to_string());

        let environment =
            parse_environment(env_optional("GRADER_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("GRADER_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Math Grader API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = normalize_prefix(&env_or_default("API_PREFIX", "/api"));

        let jwt_secret = env_or_default("SUPABASE_JWT_SECRET", "");
        let jwt_audience = env_or_default("SUPABASE_JWT_AUDIENCE", "authenticated");
        let supabase_url = env_or_default("SUPABASE_URL", "").trim_end_matches('/').to_string();
        let service_role_key = env_or_default("SUPABASE_SERVICE_ROLE_KEY", "");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "postgres");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "postgres");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "10"),
        )?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let provider = parse_ai_provider(env_optional("AI_PROVIDER"))?;
        let ai_api_key = env_or_default(provider.api_key_env(), "");
        let ai_base_url = env_or_default("AI_BASE_URL", provider.default_base_url())
            .trim_end_matches('/')
            .to_string();
        let ai_model = env_or_default("AI_MODEL", provider.default_model());
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "2000"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "90"))?;
        let ai_max_retries = parse_u32("AI_MAX_RETRIES", env_or_default("AI_MAX_RETRIES", "1"))?;
        let feedback_language = env_or_default("AI_FEEDBACK_LANGUAGE", "Mongolian");

        let upload_dir = env_or_default("UPLOAD_DIR", "./uploads");
        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let allowed_extensions = parse_string_list(
            env_optional("ALLOWED_UPLOAD_EXTENSIONS"),
            &["jpg", "jpeg", "png", "pdf"],
        );

        let rate_limit =
            parse_u64("GRADING_RATE_LIMIT", env_or_default("GRADING_RATE_LIMIT", "30"))?;
        let rate_window_seconds = parse_u64(
            "GRADING_RATE_WINDOW_SECONDS",
            env_or_default("GRADING_RATE_WINDOW_SECONDS", "60"),
        )?;

        let log_level = env_or_default("GRADER_LOG_LEVEL", "info");
        let json = env_optional("GRADER_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix },
            auth: AuthSettings { jwt_secret, jwt_audience, supabase_url, service_role_key },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            ai: AiSettings {
                provider,
                api_key: ai_api_key,
                base_url: ai_base_url,
                model: ai_model,
                max_tokens: ai_max_tokens,
                request_timeout_seconds: ai_request_timeout,
                max_retries: ai_max_retries,
                feedback_language,
            },
            uploads: UploadSettings { upload_dir, max_upload_size_mb, allowed_extensions },
            grading: GradingSettings { rate_limit, rate_window_seconds },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn auth(&self) -> &AuthSettings {
        &self.auth
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn uploads(&self) -> &UploadSettings {
        &self.uploads
    }

    pub(crate) fn grading(&self) -> &GradingSettings {
        &self.grading
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.uploads.allowed_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_UPLOAD_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.uploads.allowed_extensions {
            if !is_supported_upload_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_UPLOAD_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.uploads.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: "0".to_string(),
            });
        }

        if self.ai.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "AI_REQUEST_TIMEOUT",
                value: "0".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret("SUPABASE_JWT_SECRET"));
        }
        if self.ai.api_key.is_empty() {
            return Err(ConfigError::MissingSecret(self.ai.provider.api_key_env()));
        }

        Ok(())
    }
}
