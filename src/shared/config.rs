//! Application configuration. API credentials, paths, channel pairs.
//!
//! Sections: `[general]` (credentials, proxy, session), `[forward]` (batch
//! pairs), `[monitor]` (live pairs). Loaded from a TOML file plus the
//! `TG_RELAY_` environment.

use crate::domain::{DomainError, MediaKind, TextReplacement};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default seconds between replicated groups in a batch run.
const DEFAULT_FORWARD_DELAY_SECS: f64 = 0.1;

/// Default capacity of the media pipeline queue (groups).
pub const DEFAULT_MEDIA_QUEUE_SIZE: usize = 4;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub forward: ForwardConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct GeneralConfig {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    /// File-system-safe identifier; the session lives at `sessions/<name>`.
    pub session_name: Option<String>,
    pub proxy: Option<ProxyConfig>,
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub scheme: ProxyScheme,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyScheme {
    Socks5,
    Http,
}

impl ProxyConfig {
    /// URL form, credentials included when present.
    pub fn url(&self) -> String {
        let scheme = match self.scheme {
            ProxyScheme::Socks5 => "socks5",
            ProxyScheme::Http => "http",
        };
        match (&self.user, &self.pass) {
            (Some(u), Some(p)) => format!("{}://{}:{}@{}:{}", scheme, u, p, self.host, self.port),
            (Some(u), None) => format!("{}://{}@{}:{}", scheme, u, self.host, self.port),
            _ => format!("{}://{}:{}", scheme, self.host, self.port),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ForwardConfig {
    /// Seconds between groups. Defaults to 0.1.
    pub forward_delay: Option<f64>,
    /// Scratch root for restricted-source downloads. Defaults to `<data>/tmp`.
    pub tmp_path: Option<String>,
    #[serde(default, rename = "forward_channel_pairs")]
    pub pairs: Vec<PairConfig>,
}

impl ForwardConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.forward_delay.unwrap_or(DEFAULT_FORWARD_DELAY_SECS))
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct MonitorConfig {
    /// ISO date; the monitor stops at midnight of that date.
    pub duration: Option<String>,
    #[serde(default, rename = "monitor_channel_pairs")]
    pub pairs: Vec<PairConfig>,
}

impl MonitorConfig {
    pub fn stop_date(&self) -> Result<Option<chrono::NaiveDate>, DomainError> {
        match &self.duration {
            None => Ok(None),
            Some(s) => s
                .parse::<chrono::NaiveDate>()
                .map(Some)
                .map_err(|e| DomainError::Config(format!("monitor duration '{}': {}", s, e))),
        }
    }
}

/// One declared replication rule, pre-resolution. `PairController` turns
/// these into `ChannelPair` records with canonical ids.
#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    pub source_channel: String,
    pub target_channels: Vec<String>,
    #[serde(default)]
    pub start_id: i32,
    #[serde(default)]
    pub end_id: i32,
    /// Absent key = all kinds pass.
    pub media_types: Option<Vec<MediaKind>>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub text_replacements: Vec<TextReplacement>,
    #[serde(default)]
    pub exclude_links: bool,
    #[serde(default)]
    pub remove_captions: bool,
    #[serde(default)]
    pub hide_author: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub send_final_message: bool,
    pub final_message_html_path: Option<PathBuf>,
    #[serde(default)]
    pub enable_web_page_preview: bool,
    /// Anything the schema does not know; warned about, never fatal.
    #[serde(flatten)]
    pub unknown: HashMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl PairConfig {
    /// Structural validation and normalization. Deduplicates targets
    /// (order-preserving) and rejects pairs that can never run. The
    /// id-level `source != target` check happens again after resolution.
    pub fn validate(&mut self, scope: &str) -> Result<(), DomainError> {
        for key in self.unknown.keys() {
            warn!(scope, key, "unknown channel pair option ignored");
        }

        let source = canon_ident(&self.source_channel);
        if source.is_empty() {
            return Err(DomainError::Config(format!(
                "{}: source_channel is empty",
                scope
            )));
        }

        let mut seen = Vec::new();
        let mut deduped = Vec::new();
        for raw in &self.target_channels {
            let canon = canon_ident(raw);
            if canon.is_empty() {
                return Err(DomainError::Config(format!(
                    "{}: empty target channel",
                    scope
                )));
            }
            if canon == source {
                return Err(DomainError::Config(format!(
                    "{}: source '{}' is also a target",
                    scope, self.source_channel
                )));
            }
            if !seen.contains(&canon) {
                seen.push(canon);
                deduped.push(raw.clone());
            }
        }
        if deduped.is_empty() {
            return Err(DomainError::Config(format!(
                "{}: no target channels after deduplication",
                scope
            )));
        }
        self.target_channels = deduped;

        if self.start_id < 0 || self.end_id < 0 {
            return Err(DomainError::Config(format!(
                "{}: negative message id bound",
                scope
            )));
        }
        if self.start_id > 0 && self.end_id > 0 && self.start_id > self.end_id {
            return Err(DomainError::Config(format!(
                "{}: start_id {} > end_id {}",
                scope, self.start_id, self.end_id
            )));
        }

        if let Some(kinds) = &self.media_types {
            if kinds.is_empty() {
                warn!(scope, "media_types is empty: every message will be dropped");
            }
        }
        if self.send_final_message && self.final_message_html_path.is_none() {
            return Err(DomainError::Config(format!(
                "{}: send_final_message without final_message_html_path",
                scope
            )));
        }

        Ok(())
    }
}

/// File-system-safe identifier: the session file must stay inside the
/// sessions directory whatever the config says.
pub fn is_fs_safe_session_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Textual canonical form for duplicate detection: lowercase, stripped of
/// scheme/host prefixes and `@`. Resolution-level identity is checked later.
fn canon_ident(raw: &str) -> String {
    let s = raw.trim().to_lowercase();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(&s);
    let s = s.strip_prefix("t.me/").or_else(|| s.strip_prefix("telegram.me/")).unwrap_or(s);
    s.strip_prefix('@').unwrap_or(s).to_string()
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("TG_RELAY_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        } else {
            c = c.add_source(config::File::with_name("tg-relay").required(false));
        }
        c = c.add_source(config::Environment::with_prefix("TG_RELAY").separator("__"));
        c.build()?.try_deserialize()
    }

    /// Validate every declared pair; invalid pairs are rejected as a whole
    /// (the engine refuses to start with a half-valid pair list).
    pub fn validate(&mut self) -> Result<(), DomainError> {
        if let Some(name) = &self.general.session_name {
            if !is_fs_safe_session_name(name) {
                return Err(DomainError::Config(format!(
                    "session_name '{}' is not a file-system-safe identifier",
                    name
                )));
            }
        }
        if self.forward.forward_delay.is_some_and(|d| d < 0.0 || !d.is_finite()) {
            return Err(DomainError::Config("forward_delay must be a non-negative number".into()));
        }
        for (i, pair) in self.forward.pairs.iter_mut().enumerate() {
            pair.validate(&format!("forward pair #{}", i + 1))?;
        }
        for (i, pair) in self.monitor.pairs.iter_mut().enumerate() {
            pair.validate(&format!("monitor pair #{}", i + 1))?;
        }
        self.monitor.stop_date()?;
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(self.general.data_dir.as_deref().unwrap_or("./data"))
    }

    pub fn session_name(&self) -> &str {
        self.general.session_name.as_deref().unwrap_or("tg-relay")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir().join("sessions")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir().join("history.db")
    }

    pub fn tmp_path(&self) -> PathBuf {
        match &self.forward.tmp_path {
            Some(p) => PathBuf::from(p),
            None => self.data_dir().join("tmp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(source: &str, targets: &[&str]) -> PairConfig {
        PairConfig {
            source_channel: source.into(),
            target_channels: targets.iter().map(|s| s.to_string()).collect(),
            start_id: 0,
            end_id: 0,
            media_types: None,
            keywords: vec![],
            text_replacements: vec![],
            exclude_links: false,
            remove_captions: false,
            hide_author: false,
            enabled: true,
            send_final_message: false,
            final_message_html_path: None,
            enable_web_page_preview: false,
            unknown: HashMap::new(),
        }
    }

    #[test]
    fn dedupes_targets_preserving_order() {
        let mut p = pair("@src", &["@a", "t.me/b", "@A", "@b", "@c"]);
        p.validate("test").unwrap();
        assert_eq!(p.target_channels, vec!["@a", "t.me/b", "@c"]);
    }

    #[test]
    fn rejects_empty_targets() {
        let mut p = pair("@src", &[]);
        assert!(p.validate("test").is_err());
    }

    #[test]
    fn rejects_source_in_targets() {
        let mut p = pair("@src", &["@other", "https://t.me/src"]);
        assert!(p.validate("test").is_err());
    }

    #[test]
    fn rejects_inverted_range() {
        let mut p = pair("@src", &["@dst"]);
        p.start_id = 100;
        p.end_id = 50;
        assert!(p.validate("test").is_err());
    }

    #[test]
    fn open_bounds_pass() {
        let mut p = pair("@src", &["@dst"]);
        p.start_id = 100;
        p.end_id = 0;
        p.validate("test").unwrap();
    }

    #[test]
    fn final_message_requires_body_path() {
        let mut p = pair("@src", &["@dst"]);
        p.send_final_message = true;
        assert!(p.validate("test").is_err());
        p.final_message_html_path = Some(PathBuf::from("done.html"));
        p.validate("test").unwrap();
    }

    #[test]
    fn canon_ident_strips_wrappers() {
        assert_eq!(canon_ident("https://t.me/Chan"), "chan");
        assert_eq!(canon_ident("t.me/chan"), "chan");
        assert_eq!(canon_ident("@chan"), "chan");
        assert_eq!(canon_ident("-1001234"), "-1001234");
    }

    #[test]
    fn session_name_must_be_fs_safe() {
        assert!(is_fs_safe_session_name("ok-name_1"));
        for bad in ["", "../evil", "a/b", "name with space", "dot.dot"] {
            assert!(!is_fs_safe_session_name(bad), "should reject {:?}", bad);
        }

        let mut cfg = AppConfig::default();
        cfg.general.session_name = Some("ok-name_1".into());
        cfg.validate().unwrap();
        cfg.general.session_name = Some("../evil".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn proxy_url_forms() {
        let p = ProxyConfig {
            scheme: ProxyScheme::Socks5,
            host: "127.0.0.1".into(),
            port: 1080,
            user: None,
            pass: None,
        };
        assert_eq!(p.url(), "socks5://127.0.0.1:1080");
        let p = ProxyConfig {
            user: Some("u".into()),
            pass: Some("p".into()),
            scheme: ProxyScheme::Http,
            host: "proxy".into(),
            port: 8080,
        };
        assert_eq!(p.url(), "http://u:p@proxy:8080");
    }
}
