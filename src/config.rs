use std::path::Path;

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;
use tower_lsp::lsp_types::ClientCapabilities;

use crate::diagnostics::{DiagnosticCode, Severity};
use crate::workspace::{GraphOptions, MAX_TRAVERSAL_DEPTH};

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub semantic_tokens: bool,
    /// Check the filesystem for include targets that are not tracked
    pub check_filesystem: bool,
    pub max_traversal_depth: usize,
    /// Engine functions missing from the built-in table
    pub extra_builtins: Vec<String>,
    /// Thread names the engine invokes besides the standard entry points
    pub extra_entry_points: Vec<String>,
    #[serde(default)]
    pub rules: RuleSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RuleSetting {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Falls back to the rule's own default severity
    #[serde(default)]
    pub severity: Option<Severity>,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for RuleSetting {
    fn default() -> Self {
        RuleSetting {
            enabled: true,
            severity: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuleSettings {
    pub undefined_thread: RuleSetting,
    pub undefined_label: RuleSetting,
    pub unused_thread: RuleSetting,
    pub unused_label: RuleSetting,
    pub unused_variable: RuleSetting,
    pub duplicate_thread: RuleSetting,
    pub unknown_function: RuleSetting,
    pub unreachable_code: RuleSetting,
    pub circular_dependency: RuleSetting,
    pub missing_include: RuleSetting,
    pub unused_include: RuleSetting,
}

impl RuleSettings {
    pub fn get(&self, code: DiagnosticCode) -> &RuleSetting {
        match code {
            DiagnosticCode::UndefinedThread => &self.undefined_thread,
            DiagnosticCode::UndefinedLabel => &self.undefined_label,
            DiagnosticCode::UnusedThread => &self.unused_thread,
            DiagnosticCode::UnusedLabel => &self.unused_label,
            DiagnosticCode::UnusedVariable => &self.unused_variable,
            DiagnosticCode::DuplicateThread => &self.duplicate_thread,
            DiagnosticCode::UnknownFunction => &self.unknown_function,
            DiagnosticCode::UnreachableCode => &self.unreachable_code,
            DiagnosticCode::CircularDependency => &self.circular_dependency,
            DiagnosticCode::MissingInclude => &self.missing_include,
            DiagnosticCode::UnusedInclude => &self.unused_include,
        }
    }

    pub fn get_mut(&mut self, code: DiagnosticCode) -> &mut RuleSetting {
        match code {
            DiagnosticCode::UndefinedThread => &mut self.undefined_thread,
            DiagnosticCode::UndefinedLabel => &mut self.undefined_label,
            DiagnosticCode::UnusedThread => &mut self.unused_thread,
            DiagnosticCode::UnusedLabel => &mut self.unused_label,
            DiagnosticCode::UnusedVariable => &mut self.unused_variable,
            DiagnosticCode::DuplicateThread => &mut self.duplicate_thread,
            DiagnosticCode::UnknownFunction => &mut self.unknown_function,
            DiagnosticCode::UnreachableCode => &mut self.unreachable_code,
            DiagnosticCode::CircularDependency => &mut self.circular_dependency,
            DiagnosticCode::MissingInclude => &mut self.missing_include,
            DiagnosticCode::UnusedInclude => &mut self.unused_include,
        }
    }
}

impl Settings {
    pub fn new(root_dir: &Path, capabilities: &ClientCapabilities) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/morpheus/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.morpheus",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("semantic_tokens", true)?
            .set_default("check_filesystem", true)?
            .set_default("max_traversal_depth", 32)?
            .set_default("extra_builtins", Vec::<String>::new())?
            .set_default("extra_entry_points", Vec::<String>::new())?
            .set_override_option(
                "semantic_tokens",
                capabilities.text_document.as_ref().and_then(|it| {
                    match it.semantic_tokens.is_none() {
                        true => Some(false),
                        false => None,
                    }
                }),
            )?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }

    /// Whether a rule runs, and at what severity.
    pub fn rule(&self, code: DiagnosticCode) -> Option<Severity> {
        let setting = self.rules.get(code);
        setting
            .enabled
            .then(|| setting.severity.unwrap_or_else(|| code.default_severity()))
    }

    pub fn is_extra_builtin(&self, name: &str) -> bool {
        self.extra_builtins
            .iter()
            .any(|builtin| builtin.eq_ignore_ascii_case(name))
    }

    pub fn is_extra_entry_point(&self, name: &str) -> bool {
        self.extra_entry_points
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(name))
    }

    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            check_filesystem: self.check_filesystem,
            max_depth: self.max_traversal_depth.min(MAX_TRAVERSAL_DEPTH),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            semantic_tokens: false,
            check_filesystem: true,
            max_traversal_depth: 32,
            extra_builtins: Vec::new(),
            extra_entry_points: Vec::new(),
            rules: RuleSettings::default(),
        }
    }
}
