use std::path::PathBuf;

use crate::errors::AppError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ASSETS_DIR: &str = "frontend/dist";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Server settings, read from the environment (and `.env` in development).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory holding `index.html` and the built frontend bundle.
    pub assets_dir: PathBuf,
    /// Backend the bundled UI talks to. Only reported at startup.
    pub backend_url: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    /// Missing or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let assets_dir = lookup("ASSETS_DIR")
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_ASSETS_DIR.to_string())
            .into();
        let backend_url = lookup("BACKEND_URL")
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        Self { port, assets_dir, backend_url }
    }

    pub fn index_path(&self) -> PathBuf {
        self.assets_dir.join("index.html")
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn ensure_assets(&self) -> Result<(), AppError> {
        if self.assets_dir.is_dir() {
            Ok(())
        } else {
            Err(AppError::AssetsDirMissing { path: self.assets_dir.clone() })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.assets_dir, PathBuf::from("frontend/dist"));
        assert_eq!(config.backend_url, "http://localhost:8080");
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "4100"),
            ("ASSETS_DIR", "public"),
            ("BACKEND_URL", "https://agents.example/support"),
        ]));
        assert_eq!(config.port, 4100);
        assert_eq!(config.index_path(), PathBuf::from("public/index.html"));
        assert_eq!(config.backend_url, "https://agents.example/support");
    }

    #[test]
    fn bad_port_falls_back() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")]));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn missing_assets_dir_is_reported() {
        let config = ServerConfig::from_lookup(lookup(&[("ASSETS_DIR", "/definitely/not/here")]));
        let err = config.ensure_assets().unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/definitely/not/here"));
    }
}
