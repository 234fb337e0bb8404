use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WORKER_NAME: &str = "taskplat-worker";
pub const ENV_PREFIX: &str = "TASKPLAT_";

/// Top-level config (taskplat.toml + TASKPLAT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Background worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// OS thread name given to the background worker.
    #[serde(default = "default_worker_name")]
    pub worker_name: String,
    /// Worker stack size in bytes. `None` keeps the std default.
    #[serde(default)]
    pub stack_size: Option<usize>,
    /// What the worker does when a background task panics.
    #[serde(default)]
    pub on_task_panic: PanicPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_name: default_worker_name(),
            stack_size: None,
            on_task_panic: PanicPolicy::default(),
        }
    }
}

/// Worker reaction to a panicking background task. Tasks are never retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanicPolicy {
    /// Stop the worker, discard the rest of the queue and report the panic
    /// from `shutdown()`.
    #[default]
    Terminate,
    /// Log and count the failure, then carry on with the next task.
    Isolate,
}

fn default_worker_name() -> String {
    DEFAULT_WORKER_NAME.to_string()
}

impl PlatformConfig {
    /// Load config from a TOML file with TASKPLAT_* env var overrides.
    ///
    /// Path resolution: explicit argument, then ~/.taskplat/taskplat.toml.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::PlatformError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(PlatformConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.taskplat/taskplat.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_terminate_on_panic() {
        let config = PlatformConfig::default();
        assert_eq!(config.scheduler.worker_name, DEFAULT_WORKER_NAME);
        assert_eq!(config.scheduler.stack_size, None);
        assert_eq!(config.scheduler.on_task_panic, PanicPolicy::Terminate);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = PlatformConfig::load(Some("/nonexistent/taskplat.toml")).unwrap();
        assert_eq!(config.scheduler.on_task_panic, PanicPolicy::Terminate);
    }

    #[test]
    fn toml_overrides_scheduler_section() {
        let toml = r#"
            [scheduler]
            worker_name = "gc-helper"
            stack_size = 1048576
            on_task_panic = "isolate"
        "#;
        let config: PlatformConfig = Figment::from(Serialized::defaults(PlatformConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap();
        assert_eq!(config.scheduler.worker_name, "gc-helper");
        assert_eq!(config.scheduler.stack_size, Some(1_048_576));
        assert_eq!(config.scheduler.on_task_panic, PanicPolicy::Isolate);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: PlatformConfig = Figment::new()
            .merge(Toml::string("[scheduler]\non_task_panic = \"isolate\""))
            .extract()
            .unwrap();
        assert_eq!(config.scheduler.worker_name, DEFAULT_WORKER_NAME);
        assert_eq!(config.scheduler.on_task_panic, PanicPolicy::Isolate);
    }

    #[test]
    fn unknown_panic_policy_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("taskplat-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[scheduler]\non_task_panic = \"ignore\"\n").unwrap();

        let result = PlatformConfig::load(path.to_str());
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err();
        assert!(matches!(err, crate::error::PlatformError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
