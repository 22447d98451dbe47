use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;

/// Loads the YAML application config into a `serde_json::Value`.
///
/// Loading is tolerant: a missing or malformed file yields an empty object
/// and every accessor falls back to a built-in default, so the server can
/// always come up.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
    override_path: Option<PathBuf>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            override_path: None,
        }
    }

    /// Build a service reading a fixed config file, bypassing discovery.
    pub fn with_path(paths: Arc<AppPaths>, path: PathBuf) -> Self {
        Self {
            paths,
            override_path: Some(path),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.override_path {
            return path.clone();
        }

        if let Ok(path) = env::var("CAREBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn load_config(&self) -> Value {
        load_yaml_file(&self.config_path())
    }

    /// Number of documents retrieved per query.
    pub fn retrieval_top_k(&self) -> usize {
        self.get_u64(&["retrieval", "top_k"]).unwrap_or(3).max(1) as usize
    }

    /// Base URL of the OpenAI-compatible server used for chat and embeddings.
    pub fn llm_base_url(&self) -> String {
        if let Ok(url) = env::var("CAREBOT_LLM_BASE_URL") {
            return url;
        }
        self.get_str(&["llm", "base_url"])
            .unwrap_or_else(|| "http://127.0.0.1:8080".to_string())
    }

    pub fn chat_model(&self) -> String {
        self.get_str(&["llm", "chat_model"])
            .unwrap_or_else(|| "default".to_string())
    }

    pub fn embedding_model(&self) -> String {
        self.get_str(&["llm", "embedding_model"])
            .unwrap_or_else(|| "default-embed".to_string())
    }

    pub fn generation_temperature(&self) -> f64 {
        self.get_f64(&["llm", "temperature"]).unwrap_or(0.7)
    }

    pub fn generation_max_tokens(&self) -> i32 {
        self.get_u64(&["llm", "max_tokens"]).unwrap_or(512) as i32
    }

    /// Demo credentials accepted by the token endpoint.
    pub fn demo_credentials(&self) -> Option<(String, String)> {
        let username = self.get_str(&["auth", "demo_username"])?;
        let password = self.get_str(&["auth", "demo_password"])?;
        Some((username, password))
    }

    /// Static API key accepted in addition to issued tokens.
    pub fn default_api_key(&self) -> Option<String> {
        if let Ok(key) = env::var("DEFAULT_API_KEY") {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
        self.get_str(&["auth", "default_api_key"])
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        let config = self.load_config();
        config
            .get("server")
            .and_then(|server| server.get("cors_allowed_origins"))
            .and_then(|value| value.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str())
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| item.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get_str(&self, path: &[&str]) -> Option<String> {
        self.get(path)?.as_str().map(|s| s.to_string())
    }

    fn get_u64(&self, path: &[&str]) -> Option<u64> {
        self.get(path)?.as_u64()
    }

    fn get_f64(&self, path: &[&str]) -> Option<f64> {
        self.get(path)?.as_f64()
    }

    fn get(&self, path: &[&str]) -> Option<Value> {
        let mut current = self.load_config();
        for key in path {
            current = current.get(key)?.clone();
        }
        Some(current)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) | Err(_) => Value::Object(Map::new()),
        },
        Err(_) => Value::Object(Map::new()),
    }
}
