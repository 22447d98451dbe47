use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read-only personalization data for a known user. Unknown users get
/// `None`, which downstream components treat as "no personalization".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<u32>,
    pub gender: Option<String>,
    #[serde(default)]
    pub health_conditions: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub family_history: Vec<String>,
    pub last_checkup: Option<String>,
}

/// Injected profile backend so handlers and tests never depend on
/// process-wide state.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Option<UserProfile>;
}

/// Profiles loaded once from a JSON file (user id → profile). A missing or
/// malformed file degrades to an empty store.
pub struct JsonProfileStore {
    profiles: HashMap<String, UserProfile>,
}

impl JsonProfileStore {
    pub fn from_map(profiles: HashMap<String, UserProfile>) -> Self {
        Self { profiles }
    }

    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No profile file at {}; profiles disabled", path.display());
            return Self {
                profiles: HashMap::new(),
            };
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, UserProfile>>(&contents) {
                Ok(profiles) => {
                    tracing::info!(
                        "Loaded {} user profiles from {}",
                        profiles.len(),
                        path.display()
                    );
                    Self { profiles }
                }
                Err(err) => {
                    tracing::error!("Error parsing profiles: {}", err);
                    Self {
                        profiles: HashMap::new(),
                    }
                }
            },
            Err(err) => {
                tracing::error!("Error reading profiles: {}", err);
                Self {
                    profiles: HashMap::new(),
                }
            }
        }
    }
}

#[async_trait]
impl ProfileStore for JsonProfileStore {
    async fn get(&self, user_id: &str) -> Option<UserProfile> {
        let profile = self.profiles.get(user_id).cloned();
        if profile.is_some() {
            tracing::info!("Retrieved profile for user: {}", user_id);
        } else {
            tracing::info!("No profile found for user: {}", user_id);
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_and_lookup_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profiles.json");
        fs::write(
            &path,
            r#"{
                "demo_user": {
                    "age": 42,
                    "gender": "female",
                    "health_conditions": ["hypertension"],
                    "last_checkup": "2025-02-15"
                }
            }"#,
        )
        .expect("write");

        let store = JsonProfileStore::load(&path);
        let profile = store.get("demo_user").await.expect("profile");

        assert_eq!(profile.age, Some(42));
        assert_eq!(profile.gender.as_deref(), Some("female"));
        assert_eq!(profile.health_conditions, vec!["hypertension"]);

        assert!(store.get("stranger").await.is_none());
    }

    #[tokio::test]
    async fn missing_file_degrades_to_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonProfileStore::load(&dir.path().join("missing.json"));
        assert!(store.get("anyone").await.is_none());
    }
}
