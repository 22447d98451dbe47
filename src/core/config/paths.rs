use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem locations for everything the backend reads or writes.
///
/// The retrieval artifacts (`document_content.json`, `id_map.json`,
/// `index.bin`) are produced by the `ingest` binary and loaded read-only at
/// startup.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub document_content_path: PathBuf,
    pub id_map_path: PathBuf,
    pub index_path: PathBuf,
    pub profiles_path: PathBuf,
    pub feedback_db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        let log_dir = user_data_dir.join("logs");
        let embeddings_dir = user_data_dir.join("data").join("embeddings");
        let processed_dir = user_data_dir.join("data").join("processed");

        for dir in [&user_data_dir, &log_dir, &embeddings_dir, &processed_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            log_dir,
            document_content_path: processed_dir.join("document_content.json"),
            id_map_path: embeddings_dir.join("id_map.json"),
            index_path: embeddings_dir.join("index.bin"),
            profiles_path: user_data_dir.join("profiles.json"),
            feedback_db_path: user_data_dir.join("feedback.db"),
            user_data_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("CAREBOT_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("CAREBOT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("Carebot");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("Carebot");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("carebot")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
