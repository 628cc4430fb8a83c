//! Check command handler
//!
//! Lists the functions, filters, constraints and sorters a specification
//! names and whether each one is a built-in or has to come from a plugin.
//! The specification itself is never evaluated.

use super::utils::read_document;
use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use reshape_core::{extension_references, ExtensionKind, ExtensionRegistry, Transformer};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Outcome of checking one specification
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub spec: PathBuf,
    pub plugin_folder: PathBuf,
    pub references: Vec<Reference>,
}

/// One strategy name referenced by the specification
#[derive(Debug, Serialize)]
pub struct Reference {
    pub kind: ExtensionKind,
    pub name: String,
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// How a reference resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Served by the built-in table
    Builtin,
    /// Needs a plugin; not looked up
    Plugin,
    /// Bound from a plugin
    PluginResolved,
    /// No plugin could provide it
    PluginUnresolved,
}

impl Resolution {
    fn label(self) -> &'static str {
        match self {
            Resolution::Builtin => "built-in",
            Resolution::Plugin => "plugin",
            Resolution::PluginResolved => "plugin (found)",
            Resolution::PluginUnresolved => "plugin (missing)",
        }
    }
}

impl CheckReport {
    /// Number of references that failed to bind
    pub fn unresolved(&self) -> usize {
        self.references
            .iter()
            .filter(|r| r.resolution == Resolution::PluginUnresolved)
            .count()
    }
}

/// Handle the check command
pub fn handle_check(args: CheckArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let spec = read_document(&args.spec)?;
    let transformer = Transformer::new(config.transformer.clone());
    let report = build_report(&args.spec, &spec, &transformer, args.resolve_plugins)?;

    if output.is_human() {
        output.section(&format!("Extensions referenced by {}", args.spec.display()))?;
        if report.references.is_empty() {
            output.info("No extensions referenced")?;
        } else {
            let rows: Vec<Vec<String>> = report
                .references
                .iter()
                .map(|r| {
                    vec![
                        r.kind.to_string(),
                        r.name.clone(),
                        r.resolution.label().to_string(),
                        r.detail.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            output.table(&["Kind", "Name", "Resolution", "Detail"], &rows)?;
        }
    } else {
        output.data(&report)?;
    }

    match report.unresolved() {
        0 => {
            output.success(&format!(
                "✓ {} extension reference(s) checked",
                report.references.len()
            ))?;
            Ok(())
        }
        count => Err(Error::Unresolved { count }),
    }
}

/// Classify every extension reference in `spec`
pub fn build_report(
    spec_path: &Path,
    spec: &Value,
    transformer: &Transformer,
    resolve_plugins: bool,
) -> Result<CheckReport> {
    if !spec.is_object() {
        return Err(reshape_core::Error::malformed(
            "",
            "transform specification must be a JSON object",
        )
        .into());
    }

    let registry = transformer.extensions();
    let references = extension_references(spec)
        .into_iter()
        .map(|(kind, name)| {
            let (resolution, detail) = if registry.is_builtin(kind, &name) {
                (Resolution::Builtin, None)
            } else if resolve_plugins {
                match bind(registry, kind, &name) {
                    Ok(()) => (Resolution::PluginResolved, None),
                    Err(e) => (Resolution::PluginUnresolved, Some(e.to_string())),
                }
            } else {
                (Resolution::Plugin, None)
            };
            tracing::debug!(%kind, name = %name, ?resolution, "Checked extension reference");
            Reference {
                kind,
                name,
                resolution,
                detail,
            }
        })
        .collect();

    Ok(CheckReport {
        spec: spec_path.to_path_buf(),
        plugin_folder: transformer.config().plugin_folder.clone(),
        references,
    })
}

fn bind(registry: &ExtensionRegistry, kind: ExtensionKind, name: &str) -> reshape_core::Result<()> {
    match kind {
        ExtensionKind::Function => registry.function(name).map(drop),
        ExtensionKind::Filter => registry.filter(name).map(drop),
        ExtensionKind::Constraint => registry.constraint(name).map(drop),
        ExtensionKind::Sorter => registry.sorter(name).map(drop),
    }
}
