// src/config.rs

use chrono_tz::Tz;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::{
    common::clock::{Clock, SystemClock},
    db::Repositories,
    services::{
        audit_service::AuditService,
        auth::AuthService,
        document_service::DocumentService,
        jobs::JobRunner,
        jurisdiction_service::JurisdictionService,
        mailer::{self, Mailer},
        notification_service::NotificationService,
        obligation_service::ObligationService,
        report_service::ReportService,
        review_service::ReviewService,
        storage::{ObjectStorage, S3Storage},
        task_service::TaskService,
        template_service::TemplateService,
        tenancy_service::TenancyService,
    },
};

// ---
// Configuração lida do ambiente
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    /// MinIO, R2 e outros compatíveis com S3.
    pub endpoint: Option<String>,
    pub presign_ttl_secs: u64,
    pub max_upload_bytes: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub starttls: bool,
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub daily_enabled: bool,
    pub monthly_enabled: bool,
    pub daily_hour: u32,
    pub monthly_hour: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Base dos links enviados por e-mail (convites, reset de senha).
    pub app_base_url: String,
    pub timezone: Tz,
    pub default_jurisdiction_code: String,
    pub log_format: LogFormat,
    pub cors_origins: Vec<String>,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub smtp: Option<SmtpSettings>,
    pub jobs: JobSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave/valor.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let lookup = Lookup(&get);

        let timezone_name = lookup.or("APP_TIMEZONE", "America/Argentina/Buenos_Aires");
        let timezone = Tz::from_str(&timezone_name)
            .map_err(|e| anyhow::anyhow!("APP_TIMEZONE inválida ({}): {}", timezone_name, e))?;

        let log_format = match lookup.or("LOG_FORMAT", "compact").to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let smtp = match lookup.get("SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: lookup.parse_or("SMTP_PORT", 587)?,
                username: lookup.get("SMTP_USER"),
                password: lookup.get("SMTP_PASSWORD"),
                from: lookup.or("SMTP_FROM", "CumpliRos <no-reply@cumpliros.com.ar>"),
                starttls: lookup.parse_or("SMTP_STARTTLS", true)?,
            }),
            None => None,
        };

        let jobs = JobSettings {
            daily_enabled: lookup.parse_or("JOBS_DAILY_ENABLED", true)?,
            monthly_enabled: lookup.parse_or("JOBS_MONTHLY_ENABLED", true)?,
            daily_hour: lookup.parse_or("DAILY_JOB_HOUR", 8)?,
            monthly_hour: lookup.parse_or("MONTHLY_JOB_HOUR", 3)?,
        };
        if jobs.daily_hour > 23 || jobs.monthly_hour > 23 {
            anyhow::bail!("DAILY_JOB_HOUR y MONTHLY_JOB_HOUR deben estar entre 0 y 23");
        }

        Ok(Self {
            database_url: lookup.required("DATABASE_URL")?,
            bind_addr: lookup.or("BIND_ADDR", "0.0.0.0:3000"),
            app_base_url: lookup.or("APP_BASE_URL", "http://localhost:5173"),
            timezone,
            default_jurisdiction_code: lookup.or("DEFAULT_JURISDICTION_CODE", "ar-santa-fe-rosario"),
            log_format,
            cors_origins: lookup
                .get("CORS_ORIGINS")
                .map(|v| v.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
                .unwrap_or_default(),
            auth: AuthSettings {
                jwt_secret: lookup.required("JWT_SECRET")?,
                access_token_ttl_minutes: lookup.parse_or("ACCESS_TOKEN_TTL_MINUTES", 15)?,
                refresh_token_ttl_days: lookup.parse_or("REFRESH_TOKEN_TTL_DAYS", 30)?,
                bcrypt_cost: lookup.parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            },
            storage: StorageSettings {
                bucket: lookup.or("S3_BUCKET", "cumpliros-documents"),
                region: lookup.or("S3_REGION", "us-east-1"),
                endpoint: lookup.get("S3_ENDPOINT"),
                presign_ttl_secs: lookup.parse_or("PRESIGN_TTL_SECS", 900)?,
                max_upload_bytes: lookup.parse_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            },
            smtp,
            jobs,
        })
    }
}

struct Lookup<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Lookup<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> anyhow::Result<String> {
        self.get(key).ok_or_else(|| anyhow::anyhow!("{} deve ser definida", key))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", key, raw, e)),
            None => Ok(default),
        }
    }
}

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;
    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

// ---
// Estado compartilhado
// ---

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repos: Repositories,
    pub clock: Arc<dyn Clock>,
    pub audit_service: AuditService,
    pub auth_service: AuthService,
    pub jurisdiction_service: JurisdictionService,
    pub template_service: TemplateService,
    pub tenancy_service: TenancyService,
    pub obligation_service: ObligationService,
    pub task_service: TaskService,
    pub review_service: ReviewService,
    pub document_service: DocumentService,
    pub report_service: ReportService,
    pub notification_service: NotificationService,
}

impl AppState {
    /// Composição de produção: Postgres, S3 e SMTP (ou log).
    pub fn new(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::new(&config.storage)?);
        let mailer = mailer::from_settings(config.smtp.as_ref())?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.timezone));
        Ok(Self::from_parts(config, Repositories::postgres(pool), storage, mailer, clock))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(
        config: Config,
        repos: Repositories,
        storage: Arc<dyn ObjectStorage>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let audit_service = AuditService::new(repos.audit.clone(), clock.clone());
        let notification_service =
            NotificationService::new(repos.clone(), mailer, clock.clone(), config.app_base_url.clone());

        let auth_service = AuthService::new(
            repos.clone(),
            audit_service.clone(),
            notification_service.clone(),
            clock.clone(),
            config.auth.clone(),
        );
        let jurisdiction_service = JurisdictionService::new(repos.clone(), audit_service.clone(), clock.clone());
        let template_service = TemplateService::new(
            repos.clone(),
            audit_service.clone(),
            clock.clone(),
            config.default_jurisdiction_code.clone(),
        );
        let tenancy_service = TenancyService::new(
            repos.clone(),
            audit_service.clone(),
            notification_service.clone(),
            clock.clone(),
        );
        let obligation_service = ObligationService::new(repos.clone(), audit_service.clone(), clock.clone());
        let task_service = TaskService::new(repos.clone(), audit_service.clone(), clock.clone());
        let review_service = ReviewService::new(repos.clone(), audit_service.clone(), clock.clone());
        let document_service = DocumentService::new(
            repos.clone(),
            audit_service.clone(),
            storage,
            clock.clone(),
            config.storage.clone(),
        );
        let report_service = ReportService::new(repos.clone(), clock.clone());

        Self {
            config: Arc::new(config),
            repos,
            clock,
            audit_service,
            auth_service,
            jurisdiction_service,
            template_service,
            tenancy_service,
            obligation_service,
            task_service,
            review_service,
            document_service,
            report_service,
            notification_service,
        }
    }

    pub fn job_runner(&self) -> JobRunner {
        JobRunner::new(
            self.config.jobs.clone(),
            self.repos.clone(),
            self.obligation_service.clone(),
            self.notification_service.clone(),
            self.document_service.clone(),
            self.clock.clone(),
        )
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::{
        common::clock::testing::FixedClock,
        services::{mailer::testing::RecordingMailer, storage::testing::MemoryStorage},
    };
    use chrono::NaiveDate;
    use std::collections::HashMap;

    pub fn config() -> Config {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/cumpliros_test"),
            ("JWT_SECRET", "segredo-de-teste-com-tamanho-suficiente"),
            ("BCRYPT_COST", "4"),
        ]);
        Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap()
    }

    /// Estado completo sobre repositórios, storage e mailer em memória.
    pub struct TestApp {
        pub state: AppState,
        pub storage: Arc<MemoryStorage>,
        pub mailer: Arc<RecordingMailer>,
        pub clock: Arc<FixedClock>,
    }

    pub fn app_on(today: NaiveDate) -> TestApp {
        let storage = Arc::new(MemoryStorage::default());
        let mailer = Arc::new(RecordingMailer::default());
        let clock = Arc::new(FixedClock::on(today));
        let state = AppState::from_parts(
            config(),
            Repositories::in_memory(),
            storage.clone(),
            mailer.clone(),
            clock.clone(),
        );
        TestApp { state, storage, mailer, clock }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let cfg = from(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(cfg.timezone, chrono_tz::America::Argentina::Buenos_Aires);
        assert_eq!(cfg.default_jurisdiction_code, "ar-santa-fe-rosario");
        assert_eq!(cfg.auth.access_token_ttl_minutes, 15);
        assert_eq!(cfg.auth.refresh_token_ttl_days, 30);
        assert_eq!(cfg.storage.presign_ttl_secs, 900);
        assert_eq!(cfg.storage.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(cfg.jobs.daily_hour, 8);
        assert_eq!(cfg.jobs.monthly_hour, 3);
        assert!(cfg.jobs.daily_enabled);
        assert!(cfg.smtp.is_none());
        assert_eq!(cfg.log_format, LogFormat::Compact);
    }

    #[test]
    fn missing_secret_fails() {
        let err = from(&[("DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let base = [("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "s")];
        let mut vars = base.to_vec();
        vars.push(("APP_TIMEZONE", "Marte/Olympus"));
        assert!(from(&vars).is_err());

        let mut vars = base.to_vec();
        vars.push(("DAILY_JOB_HOUR", "25"));
        assert!(from(&vars).is_err());

        let mut vars = base.to_vec();
        vars.push(("JOBS_DAILY_ENABLED", "talvez"));
        assert!(from(&vars).is_err());
    }

    #[test]
    fn smtp_is_enabled_by_host() {
        let cfg = from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "2525"),
            ("SMTP_STARTTLS", "false"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        let smtp = cfg.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert!(!smtp.starttls);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }
}
