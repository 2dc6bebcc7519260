use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "ono.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub ono: OnoConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Remote app-data endpoint and the two blobs the client works on.
#[derive(Debug, Clone, Deserialize)]
pub struct OnoConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_app_code")]
    pub app_code: String,
    #[serde(default = "default_notes_data_name")]
    pub notes_data_name: String,
    #[serde(default = "default_groups_data_name")]
    pub groups_data_name: String,
    /// Bearer credential; empty means no `Authorization` header.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for OnoConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            app_code: default_app_code(),
            notes_data_name: default_notes_data_name(),
            groups_data_name: default_groups_data_name(),
            auth_token: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Identity of the person operating this client.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OperatorConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
}

/// Polling policy used while a collection is marked occupied.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
    /// Overall ceiling for one update; 0 disables it.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogConfig {
    /// `compact` or `json`.
    #[serde(default)]
    pub format: String,
}

fn default_app_code() -> String {
    "note_test".into()
}

fn default_notes_data_name() -> String {
    "test".into()
}

fn default_groups_data_name() -> String {
    "groups".into()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    20
}

fn default_backoff_base() -> u64 {
    500
}

fn default_backoff_max() -> u64 {
    8000
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("cannot read config {path}: {e}"))?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.ono.normalize_from_env();
        self.ono.normalize()?;
        self.ono.validate()?;
        self.operator.normalize();
        self.retry.validate()?;
        Ok(())
    }
}

impl OnoConfig {
    /// Fill `base_url` and `auth_token` from `ONO_BASE_URL` / `ONO_AUTH_TOKEN`
    /// when the file leaves them empty.
    pub fn normalize_from_env(&mut self) {
        self.fill_from(|key| std::env::var(key).ok());
    }

    fn fill_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.base_url.trim().is_empty() {
            if let Some(url) = lookup("ONO_BASE_URL") {
                self.base_url = url;
            }
        }
        let token_missing = self.auth_token.as_deref().map(|t| t.trim().is_empty()).unwrap_or(true);
        if token_missing {
            self.auth_token = lookup("ONO_AUTH_TOKEN");
        }
    }

    fn normalize(&mut self) -> Result<()> {
        self.base_url = self.base_url.trim().to_string();
        if !self.base_url.is_empty() && !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        self.app_code = self.app_code.trim().to_string();
        self.notes_data_name = self.notes_data_name.trim().to_string();
        self.groups_data_name = self.groups_data_name.trim().to_string();
        self.auth_token = self
            .auth_token
            .take()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow!("ono.base_url is empty; set it in the config file or ONO_BASE_URL"));
        }
        let lower = self.base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("ono.base_url must start with http:// or https://"));
        }
        if self.app_code.is_empty() {
            return Err(anyhow!("ono.app_code must not be empty"));
        }
        if self.notes_data_name.is_empty() || self.groups_data_name.is_empty() {
            return Err(anyhow!("ono.notes_data_name and ono.groups_data_name must not be empty"));
        }
        if self.notes_data_name == self.groups_data_name {
            return Err(anyhow!("ono.notes_data_name and ono.groups_data_name must differ"));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(anyhow!("ono timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl OperatorConfig {
    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.surname = self.surname.trim().to_string();
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be >= 1"));
        }
        if self.backoff_base_ms == 0 {
            return Err(anyhow!("retry.backoff_base_ms must be positive"));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(anyhow!("retry.backoff_max_ms must be >= backoff_base_ms"));
        }
        Ok(())
    }
}
