//! Option resolution for a single loader invocation.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError (project file loading)
//! ├── project    # elmpack.toml, the global option layer
//! ├── query      # per-call query string, the request option layer
//! └── mod.rs     # layered merge + EffectiveConfig (this file)
//! ```
//!
//! # Layers
//!
//! | Layer      | Source                         | Precedence |
//! |------------|--------------------------------|------------|
//! | defaults   | `BuildMode`                    | lowest     |
//! | global     | `[elm]` table of elmpack.toml  |            |
//! | request    | loader query string / options  | highest    |
//!
//! Keys that only steer the orchestrator are lifted into `LoaderOptions`
//! and never reach the compiler.

mod error;
mod project;
mod query;

pub use error::ConfigError;
pub use project::{PROJECT_CONFIG_NAME, ProjectConfig, find_config_file};
pub use query::parse_query;

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::compiler::CompilerFlags;
use crate::core::BuildMode;
use crate::error::{LoaderError, Result};

/// Dynamic option bag, insertion ordered.
pub type OptionMap = serde_json::Map<String, Value>;

/// Concurrency ceiling when `maxInstances` is not configured.
pub const DEFAULT_MAX_INSTANCES: usize = 1;

// Orchestrator-private keys
pub const KEY_CACHE: &str = "cache";
pub const KEY_FORCE_WATCH: &str = "forceWatch";
pub const KEY_CWD: &str = "cwd";
pub const KEY_FILES: &str = "files";
pub const KEY_MAX_INSTANCES: &str = "maxInstances";
pub const KEY_STRICT_DEPENDENCIES: &str = "strictDependencies";

/// Built-in defaults for a build mode.
pub fn defaults(mode: BuildMode) -> OptionMap {
    let mut map = OptionMap::new();
    map.insert("debug".into(), Value::Bool(mode.is_development()));
    map.insert("optimize".into(), Value::Bool(mode.is_production()));
    map
}

/// Merge three option layers, later layers winning key-by-key.
///
/// Fails with a configuration error when a recognized key is malformed.
pub fn resolve(
    defaults: &OptionMap,
    global: &OptionMap,
    request: &OptionMap,
) -> Result<EffectiveConfig> {
    let mut merged = defaults.clone();
    for layer in [global, request] {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    EffectiveConfig::split(merged)
}

// ============================================================================
// EffectiveConfig
// ============================================================================

/// Typed view of the orchestrator-private keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Skip dependency resolution when the cache is non-empty.
    pub cache: bool,
    /// Treat the session as watch mode regardless of detection.
    pub force_watch: bool,
    /// Project directory; enables manifest-mode resolution.
    pub cwd: Option<PathBuf>,
    /// Explicit compile list replacing the entry module.
    pub files: Option<Vec<PathBuf>>,
    /// Ceiling on concurrently running compiler processes.
    pub max_instances: usize,
    /// Make dependency-resolution failures fatal.
    pub strict_dependencies: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            cache: false,
            force_watch: false,
            cwd: None,
            files: None,
            max_instances: DEFAULT_MAX_INSTANCES,
            strict_dependencies: false,
        }
    }
}

/// Effective configuration of one request.
///
/// Computed once; the compiler-facing map never contains private keys.
#[derive(Debug, Clone, Default)]
pub struct EffectiveConfig {
    loader: LoaderOptions,
    compiler: OptionMap,
}

impl EffectiveConfig {
    fn split(mut map: OptionMap) -> Result<Self> {
        let files = take_files(&mut map)?;
        let loader = LoaderOptions {
            cache: take_bool(&mut map, KEY_CACHE)?.unwrap_or(false),
            force_watch: take_bool(&mut map, KEY_FORCE_WATCH)?.unwrap_or(false),
            cwd: take_cwd(&mut map)?,
            files,
            max_instances: take_max_instances(&mut map)?,
            strict_dependencies: take_bool(&mut map, KEY_STRICT_DEPENDENCIES)?.unwrap_or(false),
        };
        CompilerFlags::validate(&map)?;
        Ok(Self {
            loader,
            compiler: map,
        })
    }

    #[inline]
    pub fn loader(&self) -> &LoaderOptions {
        &self.loader
    }

    /// Options forwarded to the external compiler.
    #[inline]
    pub fn compiler_options(&self) -> &OptionMap {
        &self.compiler
    }

    /// Modules to compile: the explicit `files` list, or the entry alone.
    ///
    /// Relative `files` entries are taken relative to `cwd` when set.
    pub fn files_for(&self, entry: &Path) -> Vec<PathBuf> {
        match &self.loader.files {
            Some(files) => files
                .iter()
                .map(|f| match &self.loader.cwd {
                    Some(cwd) if f.is_relative() => cwd.join(f),
                    _ => f.clone(),
                })
                .collect(),
            None => vec![entry.to_path_buf()],
        }
    }
}

// ============================================================================
// Key extraction
// ============================================================================

fn invalid(key: &str, expected: &str, found: &Value) -> LoaderError {
    LoaderError::Configuration(format!("{key} option must be {expected}, found `{found}`"))
}

fn take_bool(map: &mut OptionMap, key: &str) -> Result<Option<bool>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) if s == "true" => Ok(Some(true)),
        Some(Value::String(s)) if s == "false" => Ok(Some(false)),
        Some(other) => Err(invalid(key, "a boolean", &other)),
    }
}

fn take_path(map: &mut OptionMap, key: &str) -> Result<Option<PathBuf>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(PathBuf::from(s))),
        Some(other) => Err(invalid(key, "a non-empty path", &other)),
    }
}

/// `cwd` made absolute once, so joined `files` and the compiler's working
/// directory agree.
fn take_cwd(map: &mut OptionMap) -> Result<Option<PathBuf>> {
    take_path(map, KEY_CWD)?
        .map(|cwd| {
            std::path::absolute(&cwd).map_err(|e| {
                LoaderError::Configuration(format!("invalid cwd `{}`: {e}", cwd.display()))
            })
        })
        .transpose()
}

fn take_max_instances(map: &mut OptionMap) -> Result<usize> {
    let value = match map.remove(KEY_MAX_INSTANCES) {
        None | Some(Value::Null) => return Ok(DEFAULT_MAX_INSTANCES),
        Some(value) => value,
    };

    let parsed = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n >= 1 => usize::try_from(n)
            .map_err(|_| invalid(KEY_MAX_INSTANCES, "a positive integer", &value)),
        _ => Err(invalid(KEY_MAX_INSTANCES, "a positive integer", &value)),
    }
}

fn take_files(map: &mut OptionMap) -> Result<Option<Vec<PathBuf>>> {
    let items = match map.remove(KEY_FILES) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(LoaderError::Configuration(
                "files option must be an array".into(),
            ));
        }
    };

    if items.is_empty() {
        return Err(LoaderError::Configuration(
            "You specified the 'files' option but didn't list any files".into(),
        ));
    }

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) if !s.is_empty() => Ok(PathBuf::from(s)),
            other => Err(invalid(KEY_FILES, "a list of paths", &other)),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> OptionMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_defaults_follow_mode() {
        let dev = defaults(BuildMode::Development);
        assert_eq!(dev["debug"], json!(true));
        assert_eq!(dev["optimize"], json!(false));

        let prod = defaults(BuildMode::Production);
        assert_eq!(prod["debug"], json!(false));
        assert_eq!(prod["optimize"], json!(true));
    }

    #[test]
    fn test_later_layers_win() {
        let global = map(json!({"debug": true, "report": "json"}));
        let request = map(json!({"debug": false}));
        let config = resolve(&defaults(BuildMode::Production), &global, &request).unwrap();

        let compiler = config.compiler_options();
        assert_eq!(compiler["debug"], json!(false));
        assert_eq!(compiler["optimize"], json!(true));
        assert_eq!(compiler["report"], json!("json"));
    }

    #[test]
    fn test_private_keys_never_forwarded() {
        let request = map(json!({
            "cache": true,
            "forceWatch": "true",
            "cwd": "/app",
            "files": ["src/Main.elm"],
            "maxInstances": 4,
            "strictDependencies": false,
            "verbose": true,
        }));
        let config = resolve(&OptionMap::new(), &OptionMap::new(), &request).unwrap();

        let compiler = config.compiler_options();
        for key in [
            KEY_CACHE,
            KEY_FORCE_WATCH,
            KEY_CWD,
            KEY_FILES,
            KEY_MAX_INSTANCES,
            KEY_STRICT_DEPENDENCIES,
        ] {
            assert!(!compiler.contains_key(key), "{key} leaked");
        }
        assert_eq!(compiler["verbose"], json!(true));

        let loader = config.loader();
        assert!(loader.cache);
        assert!(loader.force_watch);
        assert_eq!(loader.cwd.as_deref(), Some(Path::new("/app")));
        assert_eq!(loader.max_instances, 4);
    }

    #[test]
    fn test_default_loader_options() {
        let config = resolve(&OptionMap::new(), &OptionMap::new(), &OptionMap::new()).unwrap();
        assert_eq!(config.loader(), &LoaderOptions::default());
        assert_eq!(config.loader().max_instances, DEFAULT_MAX_INSTANCES);
    }

    #[test]
    fn test_files_must_be_array() {
        let request = map(json!({"files": "src/Main.elm"}));
        let err = resolve(&OptionMap::new(), &OptionMap::new(), &request).unwrap_err();
        assert!(err.to_string().contains("files option must be an array"));
    }

    #[test]
    fn test_files_must_be_non_empty() {
        let request = map(json!({"files": []}));
        let err = resolve(&OptionMap::new(), &OptionMap::new(), &request).unwrap_err();
        assert!(err.to_string().contains("didn't list any files"));
    }

    #[test]
    fn test_max_instances_must_be_positive() {
        for bad in [json!(0), json!(-1), json!("many"), json!(true)] {
            let request = map(json!({ "maxInstances": bad }));
            assert!(matches!(
                resolve(&OptionMap::new(), &OptionMap::new(), &request),
                Err(LoaderError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_malformed_bool_rejected() {
        let request = map(json!({"cache": 3}));
        assert!(resolve(&OptionMap::new(), &OptionMap::new(), &request).is_err());
    }

    #[test]
    fn test_files_for_entry_and_explicit_list() {
        let config = resolve(&OptionMap::new(), &OptionMap::new(), &OptionMap::new()).unwrap();
        assert_eq!(
            config.files_for(Path::new("/app/src/Main.elm")),
            vec![PathBuf::from("/app/src/Main.elm")]
        );

        let request = map(json!({"cwd": "/app", "files": ["src/A.elm", "/abs/B.elm"]}));
        let config = resolve(&OptionMap::new(), &OptionMap::new(), &request).unwrap();
        assert_eq!(
            config.files_for(Path::new("/app/src/Main.elm")),
            vec![PathBuf::from("/app/src/A.elm"), PathBuf::from("/abs/B.elm")]
        );
    }

    #[test]
    fn test_relative_cwd_is_made_absolute() {
        let request = map(json!({"cwd": "proj", "files": ["src/A.elm"]}));
        let config = resolve(&OptionMap::new(), &OptionMap::new(), &request).unwrap();

        let cwd = config.loader().cwd.clone().unwrap();
        assert!(cwd.is_absolute());
        assert!(cwd.ends_with("proj"));

        // Joined files must resolve from inside the compiler's working directory
        let files = config.files_for(Path::new("/app/src/Main.elm"));
        assert_eq!(files, vec![cwd.join("src/A.elm")]);
        assert!(files[0].is_absolute());
    }

    #[test]
    fn test_malformed_compiler_option_is_configuration_error() {
        for bad in [json!({"debug": 1}), json!({"report": false}), json!({"output": ["a"]})] {
            let err = resolve(&OptionMap::new(), &OptionMap::new(), &map(bad)).unwrap_err();
            assert!(matches!(err, LoaderError::Configuration(_)));
        }

        let unknown = map(json!({"frobnicate": 1}));
        assert!(resolve(&OptionMap::new(), &OptionMap::new(), &unknown).is_ok());
    }
}
