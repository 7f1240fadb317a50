use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_URL: &str = "https://api.elsevier.com";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, typically `https://api.elsevier.com`.
    pub url: String,
    /// Elsevier developer API key.
    pub key: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

impl ClientConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            key: key.into(),
            verify: true,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
}

pub(crate) fn load_config(
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    let mut url = url.or_else(|| std::env::var("SCOPUS_API_URL").ok());
    let mut key = key.or_else(|| std::env::var("SCOPUS_API_KEY").ok());

    let rc_candidates = rc_candidates();
    let mut file_verify: Option<bool> = None;

    if url.is_none() || key.is_none() || verify.is_none() {
        if let Some(rc_path) = rc_candidates.iter().find(|p| p.exists()) {
            let cfg = read_rc(rc_path).with_context(|| {
                format!("failed to read configuration file {}", rc_path.display())
            })?;
            tracing::debug!(path = %rc_path.display(), "loaded configuration file");

            if url.is_none() {
                url = cfg.url;
            }
            if key.is_none() {
                key = cfg.key;
            }
            file_verify = cfg.verify;
        }
    }

    let key = match key.filter(|k| !k.trim().is_empty()) {
        Some(v) => v.trim().to_string(),
        None => {
            if !rc_candidates.is_empty() {
                bail!(
                    "Missing configuration: key (set SCOPUS_API_KEY or put `key:` in one of: {})",
                    rc_candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            bail!("Missing configuration: key (set SCOPUS_API_KEY or create .scopusrc)");
        }
    };

    let url = url.unwrap_or_else(|| DEFAULT_URL.to_string());
    let verify = verify.or(file_verify).unwrap_or(true);

    Ok(ClientConfig { url, key, verify })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // `url: https://...` contains a second colon, so split on the first one only.
        if let Some((k, v)) = line.split_once(':') {
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                continue;
            }
            match k.trim() {
                "url" => cfg.url = Some(v.to_string()),
                "key" => cfg.key = Some(v.to_string()),
                "verify" => cfg.verify = Some(v != "0" && !v.eq_ignore_ascii_case("false")),
                _ => {}
            }
        }
    }

    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) SCOPUS_RC (explicit)
    // 2) ./.scopusrc
    // 3) ~/.scopusrc
    if let Ok(p) = std::env::var("SCOPUS_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".scopusrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".scopusrc"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rc_lines() {
        let cfg = parse_rc(
            "# scopus credentials\nurl: https://api.elsevier.com\nkey: \"0123abcd\"\nverify: 0\n",
        );
        assert_eq!(
            cfg,
            RcConfig {
                url: Some("https://api.elsevier.com".to_string()),
                key: Some("0123abcd".to_string()),
                verify: Some(false),
            }
        );
    }

    #[test]
    fn ignores_unknown_and_empty_values() {
        let cfg = parse_rc("key:\nproxy: http://localhost:3128\n");
        assert_eq!(cfg, RcConfig::default());
    }

    #[test]
    fn explicit_values_skip_the_environment() {
        let cfg = load_config(
            Some("http://localhost:1234".to_string()),
            Some(" abc ".to_string()),
            Some(false),
        )
        .unwrap();
        assert_eq!(cfg.url, "http://localhost:1234");
        assert_eq!(cfg.key, "abc");
        assert!(!cfg.verify);
    }

    #[test]
    fn reads_rc_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".scopusrc");
        std::fs::write(&path, "key: 'from-file'\n").unwrap();
        let cfg = read_rc(&path).unwrap();
        assert_eq!(cfg.key.as_deref(), Some("from-file"));
        assert_eq!(cfg.url, None);
    }
}
