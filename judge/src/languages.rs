//! Language configuration for compilation and execution
//!
//! The set of languages is closed: each [`Language`] variant knows whether it
//! is compiled, and the language table supplies the concrete toolchain
//! commands for it. Supporting a new language means adding a variant and its
//! default entry in `files/languages.toml`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{JudgeError, Result};
use crate::runner::CommandSpec;

/// File name of the build output inside the working directory
pub const ARTIFACT_NAME: &str = "main";

const BUILTIN_LANGUAGES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/files/languages.toml"
));

/// Supported submission languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    C,
    Python3,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Cpp, Language::C, Language::Python3];

    /// Whether the language needs a build step before running
    pub fn is_compiled(self) -> bool {
        match self {
            Language::Cpp | Language::C => true,
            Language::Python3 => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Python3 => "python3",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = JudgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpp" | "c++" | "cxx" | "g++" => Ok(Language::Cpp),
            "c" | "gcc" => Ok(Language::C),
            "python3" | "python" | "py3" | "py" => Ok(Language::Python3),
            _ => Err(JudgeError::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Command line as written in TOML: a single string or an argument array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCommand {
    Line(String),
    Args(Vec<String>),
}

impl RawCommand {
    fn into_args(self) -> Vec<String> {
        match self {
            RawCommand::Line(line) => line.split_whitespace().map(|s| s.to_string()).collect(),
            RawCommand::Args(args) => args,
        }
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawToolchain {
    compile_command: Option<RawCommand>,
    run_command: RawCommand,
    #[serde(default)]
    time_limit: Option<(u32, u32)>,
}

/// Build and run commands for one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Compile command template (None for interpreted languages)
    pub compile: Option<Vec<String>>,
    /// Run command template
    pub run: Vec<String>,
    /// Time limit multiplier and bonus: (multiplier, bonus_seconds)
    pub time_limit: Option<(u32, u32)>,
}

impl Toolchain {
    /// Compiler invocation for `source`, or None when there is no build step
    pub fn compile_command(&self, source: &Path, work_dir: &Path) -> Option<CommandSpec> {
        self.compile.as_ref().map(|template| {
            CommandSpec::from_vec(&expand(template, source, work_dir)).with_work_dir(work_dir)
        })
    }

    /// Command that runs the submission once it is built
    pub fn run_command(&self, source: &Path, work_dir: &Path) -> CommandSpec {
        CommandSpec::from_vec(&expand(&self.run, source, work_dir)).with_work_dir(work_dir)
    }

    /// actual_time = base_time * multiplier + bonus_seconds * 1000
    pub fn calculate_time_limit(&self, base_time_ms: u32) -> u32 {
        match self.time_limit {
            Some((multiplier, bonus_seconds)) => base_time_ms
                .saturating_mul(multiplier)
                .saturating_add(bonus_seconds.saturating_mul(1000)),
            None => base_time_ms,
        }
    }
}

/// Substitute `{source}`, `{artifact}` and `{work_dir}` in every argument
fn expand(template: &[String], source: &Path, work_dir: &Path) -> Vec<String> {
    let source = source.to_string_lossy();
    let artifact = work_dir.join(ARTIFACT_NAME);
    let artifact = artifact.to_string_lossy();
    let work_dir = work_dir.to_string_lossy();

    template
        .iter()
        .map(|arg| {
            arg.replace("{source}", &source)
                .replace("{artifact}", &artifact)
                .replace("{work_dir}", &work_dir)
        })
        .collect()
}

/// Toolchains for the enabled languages
#[derive(Debug, Clone)]
pub struct LanguageTable {
    toolchains: HashMap<Language, Toolchain>,
}

impl LanguageTable {
    /// Table built from the embedded `files/languages.toml`
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_LANGUAGES)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw_configs: HashMap<String, RawToolchain> =
            toml::from_str(content).map_err(|e| JudgeError::LanguageTable(e.to_string()))?;

        let mut toolchains = HashMap::new();
        for (name, raw) in raw_configs {
            let language = Language::from_str(&name)
                .map_err(|_| JudgeError::LanguageTable(format!("unknown language `{}`", name)))?;
            let toolchain = validate(language, raw)?;

            if toolchains.insert(language, toolchain).is_some() {
                return Err(JudgeError::LanguageTable(format!(
                    "language {} is configured more than once",
                    language
                )));
            }
        }

        Ok(Self { toolchains })
    }

    /// Builtin table, with entries from `path` replacing the defaults per language
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut table = Self::builtin()?;
        if let Some(path) = path {
            let content = std::fs::read_to_string(path)?;
            let overrides = Self::from_toml_str(&content)?;
            info!(
                "Loaded {} language override(s) from {}",
                overrides.toolchains.len(),
                path.display()
            );
            table.toolchains.extend(overrides.toolchains);
        }
        Ok(table)
    }

    pub fn toolchain(&self, language: Language) -> Result<&Toolchain> {
        self.toolchains
            .get(&language)
            .ok_or_else(|| JudgeError::LanguageDisabled(language.to_string()))
    }

    /// Enabled languages, in declaration order
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<_> = self.toolchains.keys().copied().collect();
        languages.sort();
        languages
    }
}

fn validate(language: Language, raw: RawToolchain) -> Result<Toolchain> {
    let run = raw.run_command.into_args();
    if run.is_empty() {
        return Err(JudgeError::LanguageTable(format!(
            "empty run_command for {}",
            language
        )));
    }

    let compile = raw.compile_command.map(RawCommand::into_args);
    match (&compile, language.is_compiled()) {
        (None, true) => {
            return Err(JudgeError::LanguageTable(format!(
                "compiled language {} requires compile_command",
                language
            )))
        }
        (Some(_), false) => {
            return Err(JudgeError::LanguageTable(format!(
                "interpreted language {} cannot have compile_command",
                language
            )))
        }
        (Some(cmd), true) if cmd.is_empty() => {
            return Err(JudgeError::LanguageTable(format!(
                "empty compile_command for {}",
                language
            )))
        }
        _ => {}
    }

    Ok(Toolchain {
        compile,
        run,
        time_limit: raw.time_limit,
    })
}
