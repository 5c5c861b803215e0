use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    /// Rc file that was consulted; `None` when no config directory could be determined.
    pub config_path: Option<PathBuf>,
}

impl Config {
    /// Defaults, then `.codexecrc`, then environment variables.
    pub fn load() -> Self {
        let mut cfg = match default_config_path() {
            Some(path) => Self::load_from(path),
            None => {
                log::debug!("no config directory available, skipping rc file");
                Self::defaults()
            }
        };

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                cfg.inner.insert(k, v);
            }
        }

        cfg
    }

    pub fn defaults() -> Self {
        Self {
            inner: default_map(),
            config_path: None,
        }
    }

    /// Defaults overlaid with the rc file at `config_path`, ignoring the environment.
    pub fn load_from(config_path: PathBuf) -> Self {
        let mut map = default_map();
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                map.extend(parse_rc(BufReader::new(file)));
            } else {
                log::warn!("cannot read config file {}", config_path.display());
            }
        }
        Self {
            inner: map,
            config_path: Some(config_path),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).filter(|v| !v.is_empty()).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.inner.insert(key.to_string(), value.to_string());
    }
}

fn parse_rc(reader: impl BufRead) -> Vec<(String, String)> {
    reader
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            line.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

fn is_config_key(k: &str) -> bool {
    k.starts_with("CODEXEC_")
}

pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|b| b.config_dir().join("codexec").join(".codexecrc"))
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("CODEXEC_NODE_PATH".into(), "node".into());
    m.insert("CODEXEC_NPM_PATH".into(), "npm".into());
    m.insert("CODEXEC_INLINE_FLAG".into(), "-e".into());
    m.insert("CODEXEC_SCRIPT_NAME".into(), "script.js".into());
    m.insert("CODEXEC_TIMEOUT".into(), "60".into());
    m.insert("CODEXEC_USE_TEMP_DIR".into(), "false".into());
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use crate::execution::RuntimeProfile;

    #[test]
    fn rc_lines_skip_comments_and_blanks() {
        let rc = "# comment\n\nCODEXEC_NPM_PATH = /opt/npm\nnot a pair\nCODEXEC_TIMEOUT=5\n";
        let pairs = parse_rc(Cursor::new(rc));
        assert_eq!(
            pairs,
            vec![
                ("CODEXEC_NPM_PATH".to_string(), "/opt/npm".to_string()),
                ("CODEXEC_TIMEOUT".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn rc_file_overrides_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(".codexecrc");
        fs::write(&path, "CODEXEC_NODE_PATH=/usr/local/bin/node\nCODEXEC_TIMEOUT=7\n")?;

        let cfg = Config::load_from(path);
        let profile = RuntimeProfile::from_config(&cfg);
        assert_eq!(profile.interpreter, "/usr/local/bin/node");
        assert_eq!(profile.package_manager, "npm");
        assert_eq!(profile.timeout, Duration::from_secs(7));
        assert!(!cfg.get_bool("CODEXEC_USE_TEMP_DIR"));
        Ok(())
    }

    #[test]
    fn defaults_without_rc_file() {
        let cfg = Config::defaults();
        assert_eq!(cfg.config_path, None);
        assert_eq!(RuntimeProfile::from_config(&cfg), RuntimeProfile::default());
    }

    #[test]
    fn default_rc_path_is_never_a_literal_tilde() {
        if let Some(path) = default_config_path() {
            assert!(!path.starts_with("~"));
            assert!(path.ends_with("codexec/.codexecrc"));
        }
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let mut cfg = Config::load_from(PathBuf::from("/nonexistent/.codexecrc"));
        cfg.set("CODEXEC_TIMEOUT", "soon");
        cfg.set("CODEXEC_TEMP_ROOT", "");
        let profile = RuntimeProfile::from_config(&cfg);
        assert_eq!(profile.timeout, Duration::from_secs(60));
        assert_eq!(profile.temp_root, None);
    }
}
