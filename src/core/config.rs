use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub openai: OpenAIConfig,
    pub upload: UploadConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

/// Connection settings for the remote assistants API
#[derive(Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model every new assistant is created with
    pub model: String,
    /// Vector stores attached to every new assistant (may be empty)
    pub default_vector_store_ids: Vec<String>,
    pub request_timeout: Duration,
    /// Delay between two polls of a vector store file batch
    pub poll_interval: Duration,
    /// Give up on a file batch that is still in progress after this long
    pub poll_timeout: Duration,
}

/// Local storage for request bytes that get re-uploaded
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub temp_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            openai: OpenAIConfig::from_env()?,
            upload: UploadConfig::from_env(),
            swagger: SwaggerConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins = split_list(
            &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        );

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl OpenAIConfig {
    const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    const DEFAULT_MODEL: &'static str = "gpt-4o";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
    const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
    const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300; // 5 minutes

    pub fn from_env() -> Result<Self, String> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "OPENAI_API_KEY environment variable is required".to_string())?;

        let base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());

        let default_vector_store_ids =
            split_list(&env::var("OPENAI_DEFAULT_VECTOR_STORE_IDS").unwrap_or_default());

        let request_timeout_secs = env::var("OPENAI_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "OPENAI_REQUEST_TIMEOUT_SECS must be a valid number".to_string())?;

        let poll_interval_ms = env::var("OPENAI_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| Self::DEFAULT_POLL_INTERVAL_MS.to_string())
            .parse::<u64>()
            .map_err(|_| "OPENAI_POLL_INTERVAL_MS must be a valid number".to_string())?;

        let poll_timeout_secs = env::var("OPENAI_POLL_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_POLL_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "OPENAI_POLL_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            api_key,
            base_url,
            model,
            default_vector_store_ids,
            request_timeout: Duration::from_secs(request_timeout_secs),
            poll_interval: Duration::from_millis(poll_interval_ms),
            poll_timeout: Duration::from_secs(poll_timeout_secs),
        })
    }
}

// The API key must never end up in logs
impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("default_vector_store_ids", &self.default_vector_store_ids)
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

impl UploadConfig {
    pub fn from_env() -> Self {
        let temp_dir = env::var("UPLOAD_TEMP_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("assistant-relay"));

        Self { temp_dir }
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Assistant Relay API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "HTTP relay for the OpenAI assistants API".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

/// Split a comma-separated env value, dropping empty entries
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
