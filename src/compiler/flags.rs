//! Compiler-facing options → `elm make` flags.
//!
//! | Option      | Flag                 |
//! |-------------|----------------------|
//! | `debug`     | `--debug`            |
//! | `optimize`  | `--optimize`         |
//! | `report`    | `--report=<value>`   |
//! | `docs`      | `--docs=<path>`      |
//! | `output`    | `--output=<path>`    |
//! | `pathToElm` | program to run       |
//! | `verbose`   | log the command line |
//!
//! Anything else is reported as an unknown option and otherwise ignored.

use serde_json::Value;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::OptionMap;
use crate::error::{LoaderError, Result};
use crate::loader::Emitter;

/// Default compiler output suffix.
pub const DEFAULT_SUFFIX: &str = ".js";

/// Typed compiler options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerFlags {
    pub debug: bool,
    pub optimize: bool,
    pub report: Option<String>,
    pub docs: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub path_to_elm: Option<PathBuf>,
    pub verbose: bool,
}

impl CompilerFlags {
    /// Interpret an option map, warning about keys the compiler does not know.
    pub fn from_options(options: &OptionMap, emitter: &Emitter) -> Result<Self> {
        let mut flags = Self::default();

        for (key, value) in options {
            match key.as_str() {
                "debug" => flags.debug = bool_option(key, value)?,
                "optimize" => flags.optimize = bool_option(key, value)?,
                "verbose" => flags.verbose = bool_option(key, value)?,
                "report" => flags.report = string_option(key, value)?,
                "docs" => flags.docs = string_option(key, value)?.map(PathBuf::from),
                "output" => flags.output = string_option(key, value)?.map(PathBuf::from),
                "pathToElm" => flags.path_to_elm = string_option(key, value)?.map(PathBuf::from),
                unknown => emitter.warning(format!("Unknown Elm compiler option: {unknown}")),
            }
        }

        if flags.debug && flags.optimize {
            emitter.warning("`debug` cannot be combined with `optimize`; ignoring `debug`");
            flags.debug = false;
        }

        Ok(flags)
    }

    /// Check the shape of known options; unknown keys are left alone.
    ///
    /// Lets malformed options fail before any compilation is scheduled.
    pub fn validate(options: &OptionMap) -> Result<()> {
        for (key, value) in options {
            match key.as_str() {
                "debug" | "optimize" | "verbose" => {
                    bool_option(key, value)?;
                }
                "report" | "docs" | "output" | "pathToElm" => {
                    string_option(key, value)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Suffix for the temporary output file, taken from `output` if set.
    pub fn output_suffix(&self) -> String {
        self.output
            .as_ref()
            .and_then(|p| p.extension())
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_else(|| DEFAULT_SUFFIX.to_string())
    }

    /// Flags after the file list, excluding `--output`.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if self.debug {
            args.push("--debug".into());
        }
        if self.optimize {
            args.push("--optimize".into());
        }
        if let Some(report) = &self.report {
            args.push(format!("--report={report}").into());
        }
        if let Some(docs) = &self.docs {
            let mut arg = OsString::from("--docs=");
            arg.push(docs);
            args.push(arg);
        }
        args
    }
}

fn bool_option(key: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        other => Err(LoaderError::Configuration(format!(
            "compiler option `{key}` must be a boolean, found `{other}`"
        ))),
    }
}

fn string_option(key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(LoaderError::Configuration(format!(
            "compiler option `{key}` must be a string, found `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Emission;
    use serde_json::json;

    fn options(value: Value) -> OptionMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_known_options_map_to_flags() {
        let (emitter, mut queue) = Emitter::channel();
        let flags = CompilerFlags::from_options(
            &options(json!({"optimize": true, "report": "json", "docs": "docs.json"})),
            &emitter,
        )
        .unwrap();

        let args: Vec<_> = flags
            .to_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, ["--optimize", "--report=json", "--docs=docs.json"]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_unknown_option_warns() {
        let (emitter, mut queue) = Emitter::channel();
        CompilerFlags::from_options(&options(json!({"foo": "bar"})), &emitter).unwrap();

        let emitted = queue.drain();
        assert_eq!(emitted.len(), 1);
        assert!(matches!(
            &emitted[0],
            Emission::Warning(msg) if msg.contains("Unknown Elm compiler option: foo")
        ));
    }

    #[test]
    fn test_debug_dropped_with_optimize() {
        let (emitter, mut queue) = Emitter::channel();
        let flags = CompilerFlags::from_options(
            &options(json!({"debug": true, "optimize": true})),
            &emitter,
        )
        .unwrap();
        assert!(!flags.debug);
        assert!(flags.optimize);
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn test_malformed_known_option() {
        let (emitter, _queue) = Emitter::channel();
        let err = CompilerFlags::from_options(&options(json!({"debug": 1})), &emitter).unwrap_err();
        assert!(err.to_string().contains("must be a boolean"));
    }

    #[test]
    fn test_validate_ignores_unknown_keys() {
        assert!(CompilerFlags::validate(&options(json!({"optimize": "true", "foo": 1}))).is_ok());
        assert!(CompilerFlags::validate(&options(json!({"docs": 3}))).is_err());
    }

    #[test]
    fn test_output_suffix() {
        let mut flags = CompilerFlags::default();
        assert_eq!(flags.output_suffix(), ".js");
        flags.output = Some(PathBuf::from("dist/index.html"));
        assert_eq!(flags.output_suffix(), ".html");
    }
}
