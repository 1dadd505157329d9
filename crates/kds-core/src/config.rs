//! Configuration types for the DNS sync system
//!
//! Configuration is assembled from up to three [`ConfigLayer`]s, lowest
//! precedence first:
//!
//! 1. a TOML file,
//! 2. `APP_`-prefixed environment variables,
//! 3. command-line flags.
//!
//! Every layer is keyed by the same normalized dotted names: `APP_DNS_ZONE`,
//! `--dns-zone` and `[dns] zone` all set `dns.zone`. The merged layer is
//! resolved once into an immutable [`SyncConfig`].

use crate::duration::{format_duration, parse_duration};
use crate::error::{Error, Result};
use crate::record::{normalize_name, qualify};
use crate::selector::LabelSelector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Prefix for environment variables
pub const ENV_PREFIX: &str = "APP_";

/// Default polling interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

pub const KEY_DNS_PROVIDER: &str = "dns.provider";
pub const KEY_DNS_HOSTNAME: &str = "dns.hostname";
pub const KEY_DNS_ZONE: &str = "dns.zone";
pub const KEY_DNS_TTL: &str = "dns.ttl";
pub const KEY_DNS_TOKEN: &str = "dns.token";
pub const KEY_KUBECONFIG: &str = "kubeconfig";
pub const KEY_WATCH_INTERVAL: &str = "watch.interval";
pub const KEY_NODE_LABELS: &str = "node.labels";
pub const KEY_LOG_FORMAT: &str = "log.format";
pub const KEY_DRY_RUN: &str = "dry.run";

const KNOWN_KEYS: &[&str] = &[
    KEY_DNS_PROVIDER,
    KEY_DNS_HOSTNAME,
    KEY_DNS_ZONE,
    KEY_DNS_TTL,
    KEY_DNS_TOKEN,
    KEY_KUBECONFIG,
    KEY_WATCH_INTERVAL,
    KEY_NODE_LABELS,
    KEY_LOG_FORMAT,
    KEY_DRY_RUN,
];

/// Providers with a built-in adapter
pub const SUPPORTED_PROVIDERS: &[&str] = &["cloudflare", "digitalocean", "linode"];

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// DNS provider and credentials
    pub provider: ProviderConfig,

    /// Hostnames to keep in sync, processed in order every tick
    pub targets: Vec<DnsTarget>,

    /// Time between ticks
    pub interval: Duration,

    /// Explicit kubeconfig path; in-cluster/default discovery when unset
    pub kubeconfig: Option<PathBuf>,

    /// Log output format
    pub log_format: LogFormat,

    /// Log planned changes without applying them
    pub dry_run: bool,
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the essentials
    pub fn new(provider: ProviderConfig, targets: Vec<DnsTarget>) -> Self {
        Self {
            provider,
            targets,
            interval: DEFAULT_INTERVAL,
            kubeconfig: None,
            log_format: LogFormat::Auto,
            dry_run: false,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.provider.validate()?;

        if self.targets.is_empty() {
            return Err(Error::config(
                "No DNS targets configured. Set dns.hostname or add [[targets]] to the config file",
            ));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            target.validate()?;
            if !seen.insert(target.fqdn()) {
                return Err(Error::config(format!(
                    "Hostname {} is configured more than once",
                    target.fqdn()
                )));
            }
        }

        if self.interval.is_zero() {
            return Err(Error::config("watch.interval must be greater than zero"));
        }

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// API token with Zone:DNS:Edit permission
        api_token: String,
    },

    /// DigitalOcean provider
    DigitalOcean {
        /// Personal access token with write scope
        api_token: String,
    },

    /// Linode provider
    Linode {
        /// Personal access token with Domains read/write
        api_token: String,
    },
}

impl ProviderConfig {
    /// Build a provider configuration from its type name and token
    pub fn from_parts(provider: &str, api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        match provider.trim().to_ascii_lowercase().as_str() {
            "cloudflare" => Ok(Self::Cloudflare { api_token }),
            "digitalocean" => Ok(Self::DigitalOcean { api_token }),
            "linode" => Ok(Self::Linode { api_token }),
            other => Err(Error::config(format!(
                "DNS provider '{other}' is not supported. Supported providers: {}",
                SUPPORTED_PROVIDERS.join(", ")
            ))),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_token().trim().is_empty() {
            return Err(Error::config(format!(
                "{} API token cannot be empty",
                self.type_name()
            )));
        }
        Ok(())
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Cloudflare { .. } => "cloudflare",
            Self::DigitalOcean { .. } => "digitalocean",
            Self::Linode { .. } => "linode",
        }
    }

    /// The API token. Never log this value
    pub fn api_token(&self) -> &str {
        match self {
            Self::Cloudflare { api_token }
            | Self::DigitalOcean { api_token }
            | Self::Linode { api_token } => api_token,
        }
    }
}

// Tokens must never reach logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("type", &self.type_name())
            .field("api_token", &"<REDACTED>")
            .finish()
    }
}

/// One hostname kept in sync with a set of nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsTarget {
    /// Record name to manage, absolute or relative to `zone`
    pub hostname: String,

    /// Zone the provider operates on
    pub zone: String,

    /// Nodes contributing addresses
    pub label_selector: LabelSelector,

    /// TTL for created records; zero means provider default
    pub ttl: Duration,
}

impl DnsTarget {
    pub fn new(hostname: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            zone: zone.into(),
            label_selector: LabelSelector::default(),
            ttl: Duration::ZERO,
        }
    }

    pub fn with_selector(mut self, selector: LabelSelector) -> Self {
        self.label_selector = selector;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Absolute record name
    pub fn fqdn(&self) -> String {
        qualify(&self.hostname, &self.zone)
    }

    /// TTL to request from the provider, `None` for its default
    pub fn record_ttl(&self) -> Option<Duration> {
        (!self.ttl.is_zero()).then_some(self.ttl)
    }

    /// Validate hostname, zone and TTL
    pub fn validate(&self) -> Result<()> {
        // Providers take whole seconds; zero alone means their default.
        if !self.ttl.is_zero() && self.ttl < Duration::from_secs(1) {
            return Err(Error::config(format!(
                "DNS TTL for '{}' must be 0 or at least 1s, got {}",
                self.hostname,
                format_duration(self.ttl)
            )));
        }
        if self.zone.trim().is_empty() {
            return Err(Error::config(format!(
                "DNS zone is required for hostname '{}'",
                self.hostname
            )));
        }
        if self.hostname.trim().is_empty() {
            return Err(Error::config("DNS hostname cannot be empty"));
        }
        validate_domain_name(&normalize_name(&self.zone), false)?;
        validate_domain_name(&self.fqdn(), true)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON when stdout is not a terminal, human-readable otherwise
    #[default]
    Auto,
    /// Human-readable key=value lines
    Logfmt,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "logfmt" => Ok(Self::Logfmt),
            "json" => Ok(Self::Json),
            other => Err(Error::config(format!(
                "Invalid log format '{other}'. Valid formats: logfmt, json"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Logfmt => "logfmt",
            Self::Json => "json",
        })
    }
}

/// A TTL or interval given either as seconds or as a duration string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum DurationSetting {
    Seconds(u64),
    Text(String),
}

impl DurationSetting {
    fn to_duration(&self) -> Result<Duration> {
        match self {
            Self::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            Self::Text(text) => parse_duration(text),
        }
    }
}

/// A `[[targets]]` entry from the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetEntry {
    hostname: String,
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    ttl: Option<DurationSetting>,
    #[serde(default)]
    node_labels: Option<LabelSelector>,
}

/// One source of configuration values
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    values: BTreeMap<String, String>,
    targets: Vec<TargetEntry>,
}

impl ConfigLayer {
    /// Create an empty layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, normalizing the key
    ///
    /// # Errors
    ///
    /// Unknown keys are rejected so typos surface at startup.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = normalize_key(key);
        if !KNOWN_KEYS.contains(&key.as_str()) {
            return Err(Error::config(format!("Unknown configuration key '{key}'")));
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    /// Get a raw value by normalized key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether the layer holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.targets.is_empty()
    }

    /// Build a layer from `APP_`-prefixed variables in the process environment
    pub fn from_env() -> Self {
        Self::from_env_vars(std::env::vars(), ENV_PREFIX)
    }

    /// Build a layer from arbitrary `(name, value)` pairs
    ///
    /// Variables without `prefix` are ignored, as are prefixed variables
    /// that do not name a configuration key.
    pub fn from_env_vars<I>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::new();
        for (name, value) in vars {
            let Some(stripped) = name.strip_prefix(prefix) else {
                continue;
            };
            if layer.set(stripped, value).is_err() {
                debug!(variable = %name, "Ignoring unrecognized environment variable");
            }
        }
        layer
    }

    /// Load a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| e.context(format!("Failed to load {}", path.display())))
    }

    /// Parse TOML config text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(text).map_err(|e| Error::config(format!("Invalid TOML: {e}")))?;

        let mut layer = Self::new();
        for (key, value) in table {
            if key == "targets" {
                layer.targets = value
                    .try_into()
                    .map_err(|e| Error::config(format!("Invalid [[targets]]: {e}")))?;
                continue;
            }
            layer.flatten(&key, value)?;
        }
        Ok(layer)
    }

    fn flatten(&mut self, prefix: &str, value: toml::Value) -> Result<()> {
        let key = normalize_key(prefix);
        match value {
            toml::Value::Table(table) if key == KEY_NODE_LABELS => {
                let selector: LabelSelector = toml::Value::Table(table)
                    .try_into()
                    .map_err(|e| Error::config(format!("Invalid node.labels: {e}")))?;
                self.set(&key, selector.to_string())
            }
            toml::Value::Table(table) => {
                for (child, value) in table {
                    self.flatten(&format!("{key}.{child}"), value)?;
                }
                Ok(())
            }
            toml::Value::String(s) => self.set(&key, s),
            toml::Value::Integer(i) => self.set(&key, i.to_string()),
            toml::Value::Boolean(b) => self.set(&key, b.to_string()),
            other => Err(Error::config(format!(
                "Unsupported value for '{key}': {other}"
            ))),
        }
    }

    /// Overlay `upper` on top of this layer
    ///
    /// Values in `upper` win; a non-empty target list in `upper` replaces
    /// this layer's list.
    pub fn merge(mut self, upper: ConfigLayer) -> Self {
        self.values.extend(upper.values);
        if !upper.targets.is_empty() {
            self.targets = upper.targets;
        }
        self
    }

    /// Resolve the layer into a validated [`SyncConfig`]
    pub fn resolve(&self) -> Result<SyncConfig> {
        let provider_name = self
            .non_empty(KEY_DNS_PROVIDER)
            .ok_or_else(|| Error::config("Missing DNS provider (dns.provider)"))?;
        let token = self
            .non_empty(KEY_DNS_TOKEN)
            .ok_or_else(|| Error::config("Missing DNS provider token (dns.token)"))?;
        let provider = ProviderConfig::from_parts(provider_name, token)?;

        let default_zone = self.non_empty(KEY_DNS_ZONE);
        let default_ttl = self
            .non_empty(KEY_DNS_TTL)
            .map(parse_duration)
            .transpose()
            .map_err(|e| e.context("Invalid dns.ttl"))?
            .unwrap_or(Duration::ZERO);
        let default_selector: LabelSelector = self
            .get(KEY_NODE_LABELS)
            .unwrap_or_default()
            .parse()?;

        let mut targets = Vec::new();
        if let Some(hostname) = self.non_empty(KEY_DNS_HOSTNAME) {
            targets.push(
                DnsTarget::new(hostname, default_zone.unwrap_or_default())
                    .with_selector(default_selector.clone())
                    .with_ttl(default_ttl),
            );
        }
        for entry in &self.targets {
            let ttl = match &entry.ttl {
                Some(ttl) => ttl
                    .to_duration()
                    .map_err(|e| e.context(format!("Invalid ttl for {}", entry.hostname)))?,
                None => default_ttl,
            };
            let zone = entry
                .zone
                .as_deref()
                .or(default_zone)
                .unwrap_or_default();
            targets.push(
                DnsTarget::new(entry.hostname.clone(), zone)
                    .with_selector(
                        entry
                            .node_labels
                            .clone()
                            .unwrap_or_else(|| default_selector.clone()),
                    )
                    .with_ttl(ttl),
            );
        }

        let interval = self
            .non_empty(KEY_WATCH_INTERVAL)
            .map(parse_duration)
            .transpose()
            .map_err(|e| e.context("Invalid watch.interval"))?
            .unwrap_or(DEFAULT_INTERVAL);

        let config = SyncConfig {
            provider,
            targets,
            interval,
            kubeconfig: self.non_empty(KEY_KUBECONFIG).map(PathBuf::from),
            log_format: self.get(KEY_LOG_FORMAT).unwrap_or_default().parse()?,
            dry_run: self
                .non_empty(KEY_DRY_RUN)
                .map(parse_bool)
                .transpose()?
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }
}

impl fmt::Debug for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: BTreeMap<&str, &str> = self
            .values
            .iter()
            .map(|(k, v)| {
                let shown = if k == KEY_DNS_TOKEN { "<REDACTED>" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("ConfigLayer")
            .field("values", &values)
            .field("targets", &self.targets.len())
            .finish()
    }
}

/// Normalize a key from any layer to its dotted form
///
/// `DNS_HOSTNAME`, `dns-hostname` and `dns.hostname` all become `dns.hostname`.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .to_ascii_lowercase()
        .replace(['_', '-'], ".")
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!("Invalid boolean '{other}'"))),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks. Underscores are allowed for service labels and a
/// single leading `*` label when `allow_wildcard` is set.
fn validate_domain_name(domain: &str, allow_wildcard: bool) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {domain}",
            domain.len()
        )));
    }

    for (index, label) in domain.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::config(format!("Domain name has empty label: '{domain}'")));
        }

        if label == "*" && allow_wildcard && index == 0 {
            continue;
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{label}'",
                label.len()
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{label}'"
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{label}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> ConfigLayer {
        ConfigLayer::from_env_vars(
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
            ENV_PREFIX,
        )
    }

    fn base() -> ConfigLayer {
        env(&[
            ("APP_DNS_PROVIDER", "cloudflare"),
            ("APP_DNS_TOKEN", "secret-token"),
            ("APP_DNS_HOSTNAME", "nodes.example.com"),
            ("APP_DNS_ZONE", "example.com"),
        ])
    }

    #[test]
    fn key_normalization() {
        assert_eq!(normalize_key("DNS_HOSTNAME"), "dns.hostname");
        assert_eq!(normalize_key("dns-hostname"), "dns.hostname");
        assert_eq!(normalize_key("watch.interval"), "watch.interval");
        assert_eq!(normalize_key("dry_run"), "dry.run");
    }

    #[test]
    fn env_layer_ignores_foreign_and_unknown_variables() {
        let layer = env(&[
            ("PATH", "/usr/bin"),
            ("APP_UNKNOWN_THING", "x"),
            ("APP_WATCH_INTERVAL", "30s"),
        ]);
        assert_eq!(layer.get(KEY_WATCH_INTERVAL), Some("30s"));
        assert_eq!(layer.values.len(), 1);
    }

    #[test]
    fn resolves_single_target_with_defaults() {
        let config = base().resolve().unwrap();

        assert_eq!(config.provider.type_name(), "cloudflare");
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.log_format, LogFormat::Auto);
        assert!(!config.dry_run);
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].fqdn(), "nodes.example.com");
        assert_eq!(config.targets[0].record_ttl(), None);
        assert!(config.targets[0].label_selector.is_empty());
    }

    #[test]
    fn precedence_is_file_then_env_then_flags() {
        let file = ConfigLayer::from_toml_str(
            r#"
            [watch]
            interval = "5m"
            [log]
            format = "json"
            [dns]
            ttl = 600
            "#,
        )
        .unwrap();

        let mut flags = ConfigLayer::new();
        flags.set("watch-interval", "10s").unwrap();

        let env_layer = base().merge(env(&[("APP_LOG_FORMAT", "logfmt")]));
        let config = file.merge(env_layer).merge(flags).resolve().unwrap();

        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.log_format, LogFormat::Logfmt);
        assert_eq!(config.targets[0].ttl, Duration::from_secs(600));
    }

    #[test]
    fn file_targets_inherit_top_level_values() {
        let file = ConfigLayer::from_toml_str(
            r#"
            dry_run = true

            [dns]
            provider = "linode"
            token = "tok"
            zone = "example.com"
            ttl = "2m"

            [node]
            labels = "role=edge"

            [[targets]]
            hostname = "edge"

            [[targets]]
            hostname = "ingress.example.org"
            zone = "example.org"
            ttl = 30
            node_labels = { pool = "ingress" }
            "#,
        )
        .unwrap();

        let config = file.resolve().unwrap();
        assert!(config.dry_run);
        assert_eq!(config.targets.len(), 2);

        let edge = &config.targets[0];
        assert_eq!(edge.fqdn(), "edge.example.com");
        assert_eq!(edge.ttl, Duration::from_secs(120));
        assert_eq!(edge.label_selector.to_string(), "role=edge");

        let ingress = &config.targets[1];
        assert_eq!(ingress.zone, "example.org");
        assert_eq!(ingress.ttl, Duration::from_secs(30));
        assert_eq!(ingress.label_selector.to_string(), "pool=ingress");
    }

    #[test]
    fn missing_essentials_are_fatal() {
        assert!(ConfigLayer::new().resolve().is_err());

        let no_targets = env(&[("APP_DNS_PROVIDER", "cloudflare"), ("APP_DNS_TOKEN", "t")]);
        assert!(no_targets.resolve().is_err());

        let no_zone = env(&[
            ("APP_DNS_PROVIDER", "cloudflare"),
            ("APP_DNS_TOKEN", "t"),
            ("APP_DNS_HOSTNAME", "nodes.example.com"),
        ]);
        assert!(no_zone.resolve().is_err());
    }

    #[test]
    fn invalid_enumerations_are_fatal() {
        let bad_provider = base().merge(env(&[("APP_DNS_PROVIDER", "route53")]));
        assert!(bad_provider.resolve().is_err());

        let bad_format = base().merge(env(&[("APP_LOG_FORMAT", "xml")]));
        assert!(bad_format.resolve().is_err());

        let alias = base().merge(env(&[("APP_LOG_FORMAT", "text")]));
        assert!(alias.resolve().is_err());

        let bad_interval = base().merge(env(&[("APP_WATCH_INTERVAL", "0s")]));
        assert!(bad_interval.resolve().is_err());
    }

    #[test]
    fn sub_second_ttl_is_rejected() {
        let half = base().merge(env(&[("APP_DNS_TTL", "500ms")]));
        assert!(half.resolve().is_err());

        let zero = base().merge(env(&[("APP_DNS_TTL", "0")]));
        assert_eq!(zero.resolve().unwrap().targets[0].record_ttl(), None);

        let one = base().merge(env(&[("APP_DNS_TTL", "1s")]));
        assert_eq!(
            one.resolve().unwrap().targets[0].record_ttl(),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn duplicate_hostnames_are_rejected() {
        let file = ConfigLayer::from_toml_str(
            r#"
            [[targets]]
            hostname = "nodes"
            "#,
        )
        .unwrap();
        assert!(file.merge(base()).resolve().is_err());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!(ConfigLayer::from_toml_str("[dns]\nhostnme = \"x\"").is_err());
    }

    #[test]
    fn tokens_are_redacted_in_debug() {
        let layer = base();
        let config = layer.resolve().unwrap();
        assert!(!format!("{layer:?}").contains("secret-token"));
        assert!(!format!("{config:?}").contains("secret-token"));
    }

    #[test]
    fn domain_validation() {
        assert!(validate_domain_name("example.com", false).is_ok());
        assert!(validate_domain_name("*.example.com", true).is_ok());
        assert!(validate_domain_name("*.example.com", false).is_err());
        assert!(validate_domain_name("-bad.example.com", false).is_err());
        assert!(validate_domain_name("a..b", false).is_err());
        assert!(validate_domain_name(&"a".repeat(64), false).is_err());
    }

    #[test]
    fn reads_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kube-dns-sync.toml");
        std::fs::write(&path, "kubeconfig = \"/etc/kube/config\"\n").unwrap();

        let layer = ConfigLayer::from_file(&path).unwrap();
        assert_eq!(layer.get(KEY_KUBECONFIG), Some("/etc/kube/config"));
        assert!(ConfigLayer::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
