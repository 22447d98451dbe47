pub mod paths;
pub mod service;

pub use paths::AppPaths;
pub use service::ConfigService;
