use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_f64,
    parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, ExamSettings,
    ProctoringSettings, RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort,
    ServerSettings, Settings, TableApiSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("INTELLIHIRE_HOST", "0.0.0.0");
        let port = env_or_default("INTELLIHIRE_PORT", "8000");

        let environment = parse_environment(
            env_optional("INTELLIHIRE_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("INTELLIHIRE_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "IntelliHire API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "intellihire");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "intellihire_db");
        let database_url = env_optional("DATABASE_URL");
        let db_max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "30"),
        )?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let pass_percentage =
            parse_f64("PASS_PERCENTAGE", env_or_default("PASS_PERCENTAGE", "40"))?;
        let analytics_pass_percentage = parse_f64(
            "ANALYTICS_PASS_PERCENTAGE",
            env_or_default("ANALYTICS_PASS_PERCENTAGE", "50"),
        )?;
        let max_violations = parse_u32("MAX_VIOLATIONS", env_or_default("MAX_VIOLATIONS", "3"))?;
        let default_duration_seconds = parse_u64(
            "DEFAULT_EXAM_DURATION_SECONDS",
            env_or_default("DEFAULT_EXAM_DURATION_SECONDS", "5400"),
        )?;
        let auto_save_interval_seconds = parse_u64(
            "AUTO_SAVE_INTERVAL_SECONDS",
            env_or_default("AUTO_SAVE_INTERVAL_SECONDS", "5"),
        )?;
        let max_concurrent_exams =
            parse_u64("MAX_CONCURRENT_EXAMS", env_or_default("MAX_CONCURRENT_EXAMS", "500"))?;

        let tick_seconds =
            parse_u64("PROCTORING_TICK_SECONDS", env_or_default("PROCTORING_TICK_SECONDS", "3"))?;
        let violation_probability = parse_f64(
            "PROCTORING_VIOLATION_PROBABILITY",
            env_or_default("PROCTORING_VIOLATION_PROBABILITY", "0.1"),
        )?;
        let expiry_sweep_seconds =
            parse_u64("EXPIRY_SWEEP_SECONDS", env_or_default("EXPIRY_SWEEP_SECONDS", "30"))?;

        let table_api_url = env_or_default("SUPABASE_URL", "");
        let table_api_key = env_optional("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|| env_optional("SUPABASE_ANON_KEY"))
            .unwrap_or_default();
        let table_api_timeout =
            parse_u64("TABLE_API_TIMEOUT_SECONDS", env_or_default("TABLE_API_TIMEOUT_SECONDS", "30"))?;

        let first_superuser_email =
            env_or_default("FIRST_SUPERUSER_EMAIL", "superadmin@intellihire.com");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("INTELLIHIRE_LOG_LEVEL", "info");
        let json =
            env_optional("INTELLIHIRE_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections: db_max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            exam: ExamSettings {
                pass_percentage,
                analytics_pass_percentage,
                max_violations,
                default_duration_seconds,
                auto_save_interval_seconds,
                max_concurrent_exams,
            },
            proctoring: ProctoringSettings {
                tick_seconds,
                violation_probability,
                expiry_sweep_seconds,
            },
            table_api: TableApiSettings {
                base_url: table_api_url,
                api_key: table_api_key,
                timeout_seconds: table_api_timeout,
            },
            admin: AdminSettings { first_superuser_email, first_superuser_password },
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

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
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

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn proctoring(&self) -> &ProctoringSettings {
        &self.proctoring
    }

    pub(crate) fn table_api(&self) -> &TableApiSettings {
        &self.table_api
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("PASS_PERCENTAGE", self.exam.pass_percentage),
            ("ANALYTICS_PASS_PERCENTAGE", self.exam.analytics_pass_percentage),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidValue { field, value: value.to_string() });
            }
        }

        if !(0.0..=1.0).contains(&self.proctoring.violation_probability) {
            return Err(ConfigError::InvalidValue {
                field: "PROCTORING_VIOLATION_PROBABILITY",
                value: self.proctoring.violation_probability.to_string(),
            });
        }

        if self.proctoring.tick_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PROCTORING_TICK_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.proctoring.expiry_sweep_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXPIRY_SWEEP_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.exam.default_duration_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DEFAULT_EXAM_DURATION_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}
