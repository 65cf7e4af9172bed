//! Configuration management

use std::path::PathBuf;

use serde::Deserialize;
use zbxutil_core::{get_secret, Error, Result, DEFAULT_KILL_SWITCH, DEFAULT_LOG_FILE};
use zbxutil_zabbix::{AuthScheme, Credentials, Endpoints, ZabbixSender, DEFAULT_SENDER_PORT};

/// Host the probe looks up when none is configured
pub const DEFAULT_TEST_HOST: &str = "Zabbix server";

fn default_sender_port() -> u16 {
    DEFAULT_SENDER_PORT
}

fn default_test_host() -> String {
    DEFAULT_TEST_HOST.to_string()
}

fn default_kill_switch() -> PathBuf {
    PathBuf::from(DEFAULT_KILL_SWITCH)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

/// Probe configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API endpoints in failover order
    pub endpoints: Endpoints,

    pub credentials: Credentials,

    /// `bearer` for API 6.4 and later, `legacy` before that
    #[serde(default)]
    pub auth_scheme: AuthScheme,

    /// Trapper to report latency to; reporting is skipped when unset
    #[serde(default)]
    pub sender_host: Option<String>,

    #[serde(default = "default_sender_port")]
    pub sender_port: u16,

    #[serde(default = "default_test_host")]
    pub test_host: String,

    #[serde(default = "default_kill_switch")]
    pub kill_switch: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Config {
    /// Load configuration from file or environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            Self::load_from_file(p)
        } else {
            Self::load_from_env()
        }
    }

    /// Load from configuration file
    fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    ///
    /// Every variable may also be supplied as a file via `<NAME>_FILE`.
    fn load_from_env() -> Result<Self> {
        Self::from_lookup(get_secret)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::ConfigError(format!("{} not configured", name)))
        };

        let primary = required("ZABBIX_URL")?;
        let backups = lookup("ZABBIX_BACKUP_URLS")
            .map(|list| Self::parse_list(&list))
            .unwrap_or_default();

        let credentials = Credentials::new(required("ZABBIX_USER")?, required("ZABBIX_PASSWORD")?);

        let auth_scheme = match lookup("ZABBIX_AUTH_SCHEME").filter(|v| !v.is_empty()) {
            Some(scheme) => scheme
                .parse()
                .map_err(|e| Error::ConfigError(format!("Invalid ZABBIX_AUTH_SCHEME: {}", e)))?,
            None => AuthScheme::default(),
        };

        let sender_port = match lookup("ZABBIX_SENDER_PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|e| Error::ConfigError(format!("Invalid ZABBIX_SENDER_PORT: {}", e)))?,
            None => DEFAULT_SENDER_PORT,
        };

        Ok(Config {
            endpoints: Endpoints::with_backups(primary, backups),
            credentials,
            auth_scheme,
            sender_host: lookup("ZABBIX_SENDER_HOST").filter(|h| !h.is_empty()),
            sender_port,
            test_host: lookup("ZABBIX_TEST_HOST").unwrap_or_else(default_test_host),
            kill_switch: lookup("ZBXUTIL_KILL_SWITCH")
                .map(PathBuf::from)
                .unwrap_or_else(default_kill_switch),
            log_file: lookup("ZBXUTIL_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(default_log_file),
        })
    }

    /// Parse a comma separated list, skipping blanks
    fn parse_list(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Configured trapper, if any
    pub fn sender(&self) -> Option<ZabbixSender> {
        self.sender_host
            .as_ref()
            .map(|host| ZabbixSender::new(host.clone(), self.sender_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_env_config_with_backups() {
        let config = Config::from_lookup(lookup(&[
            ("ZABBIX_URL", "https://zbx1.example.com"),
            ("ZABBIX_BACKUP_URLS", "https://zbx2.example.com, ,https://zbx3.example.com"),
            ("ZABBIX_USER", "automation"),
            ("ZABBIX_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.endpoints.primary(), "https://zbx1.example.com");
        assert_eq!(
            config.endpoints.backups(),
            ["https://zbx2.example.com", "https://zbx3.example.com"]
        );
        assert_eq!(config.credentials.user(), "automation");
        assert_eq!(config.sender_port, DEFAULT_SENDER_PORT);
        assert_eq!(config.test_host, DEFAULT_TEST_HOST);
        assert_eq!(config.kill_switch, PathBuf::from(DEFAULT_KILL_SWITCH));
        assert_eq!(config.auth_scheme, AuthScheme::Bearer);
        assert!(config.sender().is_none());
    }

    #[test]
    fn test_env_config_auth_scheme() {
        let base = [
            ("ZABBIX_URL", "http://zbx"),
            ("ZABBIX_USER", "a"),
            ("ZABBIX_PASSWORD", "b"),
        ];

        let mut vars = base.to_vec();
        vars.push(("ZABBIX_AUTH_SCHEME", "legacy"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.auth_scheme, AuthScheme::Legacy);

        let mut vars = base.to_vec();
        vars.push(("ZABBIX_AUTH_SCHEME", "cookie"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref msg) if msg.contains("ZABBIX_AUTH_SCHEME")));
    }

    #[test]
    fn test_toml_config_auth_scheme() {
        let config = Config::from_toml(
            r#"
            auth_scheme = "legacy"

            [endpoints]
            primary = "http://zbx"

            [credentials]
            user = "a"
            password = "b"
            "#,
        )
        .unwrap();
        assert_eq!(config.auth_scheme, AuthScheme::Legacy);

        let err = Config::from_toml(
            "auth_scheme = \"Bearer\"\n[endpoints]\nprimary = \"http://zbx\"\n[credentials]\nuser = \"a\"\npassword = \"b\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_env_config_requires_url_and_credentials() {
        let err = Config::from_lookup(lookup(&[("ZABBIX_USER", "a")])).unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref msg) if msg.contains("ZABBIX_URL")));

        let err = Config::from_lookup(lookup(&[("ZABBIX_URL", "http://zbx"), ("ZABBIX_USER", "a")]))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref msg) if msg.contains("ZABBIX_PASSWORD")));
    }

    #[test]
    fn test_env_config_sender() {
        let config = Config::from_lookup(lookup(&[
            ("ZABBIX_URL", "http://zbx"),
            ("ZABBIX_USER", "a"),
            ("ZABBIX_PASSWORD", "b"),
            ("ZABBIX_SENDER_HOST", "zbx-proxy"),
            ("ZABBIX_SENDER_PORT", "10052"),
        ]))
        .unwrap();

        let sender = config.sender().unwrap();
        assert_eq!(sender.server(), "zbx-proxy");
        assert_eq!(sender.port(), 10052);
    }

    #[test]
    fn test_env_config_rejects_bad_port() {
        let err = Config::from_lookup(lookup(&[
            ("ZABBIX_URL", "http://zbx"),
            ("ZABBIX_USER", "a"),
            ("ZABBIX_PASSWORD", "b"),
            ("ZABBIX_SENDER_PORT", "trapper"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_toml_config() {
        let config = Config::from_toml(
            r#"
            test_host = "web01"
            log_file = "/var/log/zbxutil.log"

            [endpoints]
            primary = "https://zbx1.example.com"
            backups = ["https://zbx2.example.com"]

            [credentials]
            user = "automation"
            password = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.test_host, "web01");
        assert_eq!(config.log_file, PathBuf::from("/var/log/zbxutil.log"));
        assert_eq!(config.sender_port, DEFAULT_SENDER_PORT);
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zbxutil.toml");
        std::fs::write(
            &path,
            "[endpoints]\nprimary = \"http://zbx\"\n\n[credentials]\nuser = \"a\"\npassword = \"b\"\n",
        )
        .unwrap();

        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.endpoints.primary(), "http://zbx");
        assert!(config.endpoints.backups().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some("/nonexistent/zbxutil.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref msg) if msg.contains("Failed to read config")));
    }
}
