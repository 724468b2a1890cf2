use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;

use crate::error::{Error, Result};

/// Key/value settings: built-in defaults, then `.sbxgptrc`, then environment.
///
/// The environment is snapshotted once in [`Config::load`]; later changes to
/// the process environment are not observed.
#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(default_config_path())
    }

    pub fn load_from(config_path: PathBuf) -> Self {
        let mut map = default_map();

        if config_path.exists() {
            read_rc_file(&config_path, &mut map);
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    /// Defaults plus the given pairs, ignoring rc file and environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { inner: map, config_path: default_config_path() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Value of a setting that must be present and non-blank.
    pub fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::ConfigurationMissing { key: key.to_string() })
    }

    pub fn request_timeout(&self) -> u64 {
        self.get_u64("REQUEST_TIMEOUT").unwrap_or(60)
    }
}

fn read_rc_file(path: &Path, map: &mut HashMap<String, String>) {
    let Ok(file) = fs::File::open(path) else {
        tracing::warn!(path = %path.display(), "could not open config file");
        return;
    };
    let reader = BufReader::new(file);
    for line in reader.lines().map_while(|l| l.ok()) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "GROQ_API_KEY",
        "E2B_API_KEY",
        "API_BASE_URL",
        "DEFAULT_MODEL",
        "REQUEST_TIMEOUT",
        "E2B_API_URL",
        "E2B_DOMAIN",
        "E2B_EXECD_PORT",
        "SANDBOX_TEMPLATE",
        "SANDBOX_TIMEOUT",
        "SANDBOX_EXEC_URL",
        "PRETTIFY_MARKDOWN",
    ];

    KEYS.contains(&k) || k.starts_with("SBXGPT_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("sbxgpt").join(".sbxgptrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Completion service
    m.insert("API_BASE_URL".into(), "https://api.groq.com/openai/v1".into());
    m.insert("DEFAULT_MODEL".into(), "llama-3.3-70b-versatile".into());
    m.insert("REQUEST_TIMEOUT".into(), "60".into());

    // Sandbox service
    m.insert("E2B_API_URL".into(), "https://api.e2b.dev".into());
    m.insert("E2B_DOMAIN".into(), "e2b.app".into());
    m.insert("E2B_EXECD_PORT".into(), "49999".into());
    m.insert("SANDBOX_TEMPLATE".into(), "code-interpreter-v1".into());
    m.insert("SANDBOX_TIMEOUT".into(), "300".into());

    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}
