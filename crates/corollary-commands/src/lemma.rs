//! The `lemma` command source: version management for LEMMA builds.
//!
//! The commands ask for or read a release version, then stamp it into Maven
//! POMs, OSGi manifests and properties files of the modules under the target
//! directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use corollary_config::MavenConfig;
use corollary_core::{
    Argument, Command, CommandError, CommandScope, CommandSource, Invocation, Variable,
};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::manifest::{self, SNAPSHOT_SUFFIX};
use crate::pom;
use crate::process::run_logged;
use crate::prompt::{Prompt, is_yes};
use crate::properties::{parse_properties, update_property};

/// Name the source registers its commands under.
pub const SOURCE_NAME: &str = "lemma";

const VERSION: &str = "version";

/// The LEMMA command set.
#[derive(Clone)]
pub struct LemmaSource {
    maven: MavenConfig,
    prompt: Arc<dyn Prompt>,
}

impl LemmaSource {
    pub fn new(maven: MavenConfig, prompt: Arc<dyn Prompt>) -> Self {
        Self { maven, prompt }
    }
}

impl CommandSource for LemmaSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![
            Arc::new(AskForVersion {
                prompt: Arc::clone(&self.prompt),
            }),
            Arc::new(ReadVersionFrom),
            Arc::new(AskForSnapshot {
                prompt: Arc::clone(&self.prompt),
            }),
            Arc::new(AskForContinuation {
                prompt: Arc::clone(&self.prompt),
            }),
            Arc::new(MavenGoal::tycho_set_version(self.maven.clone())),
            Arc::new(MavenGoal::update_parent_version(self.maven.clone())),
            Arc::new(UpdateParentVersionRaw),
            Arc::new(OsgiUpdateBundleVersion),
            Arc::new(UpdatePropertiesFile),
            Arc::new(DeleteFile),
        ]
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `<target>/<module>`, which must exist.
fn existing_module_directory(invocation: &Invocation<'_>) -> Result<PathBuf, CommandError> {
    let dir = invocation.module_directory()?;
    if !dir.is_dir() {
        return Err(CommandError::file(&dir, "module directory does not exist"));
    }
    Ok(dir)
}

/// Read `path`, transform its content, and write the result back.
fn rewrite_file(
    path: &Path,
    transform: impl FnOnce(&str) -> Result<String, CommandError>,
) -> Result<(), CommandError> {
    let content = fs::read_to_string(path).map_err(|e| CommandError::file(path, e.to_string()))?;
    let updated = transform(&content)?;
    fs::write(path, updated).map_err(|e| CommandError::file(path, e.to_string()))?;
    info!(path = %path.display(), "rewrote file");
    Ok(())
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

// ---------------------------------------------------------------------------
// Version commands
// ---------------------------------------------------------------------------

/// `ask_for_version`: ask the user for the release version.
struct AskForVersion {
    prompt: Arc<dyn Prompt>,
}

impl Command for AskForVersion {
    fn name(&self) -> &str {
        "ask_for_version"
    }

    fn provided_variables(&self) -> Vec<Variable> {
        vec![Variable::new(VERSION)]
    }

    fn execute(&self, _invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let version = self.prompt.ask("Please specify a version number:")?;
        if version.is_empty() {
            return Err(CommandError::invalid_value(VERSION, "no version number given"));
        }
        Ok(json!({ VERSION: version }))
    }
}

/// `read_version_from <filepath>`: read `major.minor.patch[.extra]` from a
/// properties file.
struct ReadVersionFrom;

impl Command for ReadVersionFrom {
    fn name(&self) -> &str {
        "read_version_from"
    }

    fn arguments(&self) -> Vec<Argument> {
        vec![Argument::new("filepath")]
    }

    fn provided_variables(&self) -> Vec<Variable> {
        vec![Variable::new(VERSION)]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let path = invocation.resolve_path(invocation.argument("filepath")?);
        let content = fs::read_to_string(&path).map_err(|e| CommandError::file(&path, e.to_string()))?;
        let properties = parse_properties(&content);
        let part = |key: &str| properties.get(key).map(String::as_str).filter(|v| !v.is_empty());

        let (Some(major), Some(minor), Some(patch)) = (part("major"), part("minor"), part("patch")) else {
            return Err(CommandError::file(
                &path,
                "must specify the keys \"major\", \"minor\" and \"patch\"",
            ));
        };

        let mut version = format!("{major}.{minor}.{patch}");
        if let Some(extra) = part("extra") {
            version.push('.');
            version.push_str(extra);
        }
        debug!(path = %path.display(), %version, "read version");
        Ok(json!({ VERSION: version }))
    }
}

/// `ask_for_snapshot`: ask whether this is a snapshot build and mark the
/// version accordingly.
struct AskForSnapshot {
    prompt: Arc<dyn Prompt>,
}

impl Command for AskForSnapshot {
    fn name(&self) -> &str {
        "ask_for_snapshot"
    }

    fn provided_variables(&self) -> Vec<Variable> {
        vec![Variable::new(VERSION)]
    }

    fn required_variable_names(&self) -> Vec<String> {
        vec![VERSION.to_string()]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let version = invocation.variable_text(VERSION)?;
        let answer = self.prompt.ask("Is this a snapshot release? [y/n]")?;
        if is_yes(&answer) {
            Ok(json!({ VERSION: format!("{version}{SNAPSHOT_SUFFIX}") }))
        } else {
            Ok(json!({ VERSION: version }))
        }
    }
}

/// `ask_for_continuation <variable>`: show a variable and ask whether to go
/// on. Anything but an empty answer or `y` stops the run.
struct AskForContinuation {
    prompt: Arc<dyn Prompt>,
}

impl Command for AskForContinuation {
    fn name(&self) -> &str {
        "ask_for_continuation"
    }

    fn arguments(&self) -> Vec<Argument> {
        vec![Argument::new("variable")]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let variable = invocation.argument("variable")?;
        let value = invocation.variable_text(variable)?;
        let answer = self
            .prompt
            .ask(&format!("Continue? ({variable} = {value}) [y/n]"))?;
        if !answer.is_empty() && !is_yes(&answer) {
            return Err(CommandError::Aborted("stopped at user request".to_string()));
        }
        Ok(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Module commands
// ---------------------------------------------------------------------------

/// A Maven goal run in the current module with the version appended.
struct MavenGoal {
    name: &'static str,
    goal: &'static [&'static str],
    version_property: &'static str,
    maven: MavenConfig,
}

impl MavenGoal {
    /// `mvn_tycho_set_version`: set the project version with Tycho.
    fn tycho_set_version(maven: MavenConfig) -> Self {
        Self {
            name: "mvn_tycho_set_version",
            goal: &["org.eclipse.tycho:tycho-versions-plugin:set-version"],
            version_property: "-DnewVersion=",
            maven,
        }
    }

    /// `mvn_update_parent_version`: point the parent reference at the version.
    fn update_parent_version(maven: MavenConfig) -> Self {
        Self {
            name: "mvn_update_parent_version",
            goal: &[
                "versions:update-parent",
                "-DgenerateBackupPoms=false",
                "-DallowSnapshots=true",
            ],
            version_property: "-DparentVersion=",
            maven,
        }
    }

    fn arguments(&self, log: &Path, version: &str) -> Vec<String> {
        let mut args = vec!["-l".to_string(), log.display().to_string()];
        args.extend(self.goal.iter().map(|s| s.to_string()));
        args.push(format!("{}{version}", self.version_property));
        args
    }
}

impl Command for MavenGoal {
    fn name(&self) -> &str {
        self.name
    }

    fn maximum_scope(&self) -> CommandScope {
        CommandScope::Module
    }

    fn required_variable_names(&self) -> Vec<String> {
        vec![VERSION.to_string()]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let module_dir = existing_module_directory(invocation)?;
        let version = invocation.variable_text(VERSION)?;
        let log = invocation.target_directory().join(&self.maven.log_file);
        let args = self.arguments(&log, &version);

        info!(command = self.name, module = %module_dir.display(), %version, "running maven");
        run_logged(&self.maven.program, &args, &module_dir, Some(&log))?;
        Ok(Value::Null)
    }
}

/// `mvn_update_parent_version_raw`: rewrite the parent version in the
/// module's `pom.xml` directly.
struct UpdateParentVersionRaw;

impl Command for UpdateParentVersionRaw {
    fn name(&self) -> &str {
        "mvn_update_parent_version_raw"
    }

    fn maximum_scope(&self) -> CommandScope {
        CommandScope::Module
    }

    fn required_variable_names(&self) -> Vec<String> {
        vec![VERSION.to_string()]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let pom_file = existing_module_directory(invocation)?.join("pom.xml");
        let version = invocation.variable_text(VERSION)?;
        rewrite_file(&pom_file, |content| {
            pom::set_parent_version(content, &version)
                .map_err(|reason| CommandError::file(&pom_file, reason))?
                .ok_or_else(|| CommandError::file(&pom_file, "does not specify a parent version"))
        })?;
        Ok(Value::Null)
    }
}

/// `osgi_update_bundle_version`: stamp the version into the module's
/// `META-INF/MANIFEST.MF`.
struct OsgiUpdateBundleVersion;

impl Command for OsgiUpdateBundleVersion {
    fn name(&self) -> &str {
        "osgi_update_bundle_version"
    }

    fn maximum_scope(&self) -> CommandScope {
        CommandScope::Module
    }

    fn required_variable_names(&self) -> Vec<String> {
        vec![VERSION.to_string()]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let manifest_file = existing_module_directory(invocation)?
            .join("META-INF")
            .join("MANIFEST.MF");
        let version = manifest::osgi_version(&invocation.variable_text(VERSION)?);
        rewrite_file(&manifest_file, |content| {
            manifest::update_bundle_version(content, &version)
                .ok_or_else(|| CommandError::file(&manifest_file, "has no Bundle-Version header"))
        })?;
        Ok(Value::Null)
    }
}

/// `update_properties_file <filepath> <propertyName> <variable>`: assign a
/// variable's value to a property of a file in the current module.
struct UpdatePropertiesFile;

impl Command for UpdatePropertiesFile {
    fn name(&self) -> &str {
        "update_properties_file"
    }

    fn maximum_scope(&self) -> CommandScope {
        CommandScope::Module
    }

    fn arguments(&self) -> Vec<Argument> {
        vec![
            Argument::new("filepath"),
            Argument::new("propertyName"),
            Argument::new("variable"),
        ]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let value = invocation.variable_text(invocation.argument("variable")?)?;
        let property = invocation.argument("propertyName")?;
        let file = existing_module_directory(invocation)?.join(invocation.argument("filepath")?);
        rewrite_file(&file, |content| {
            update_property(content, property, &value)
                .ok_or_else(|| CommandError::file(&file, format!("has no property \"{property}\"")))
        })?;
        Ok(Value::Null)
    }
}

/// `delete_file <filepath>`: delete a file below the target directory.
///
/// Relative paths resolve against the current module when one is visible.
struct DeleteFile;

impl Command for DeleteFile {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn arguments(&self) -> Vec<Argument> {
        vec![Argument::new("filepath")]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        let filepath = Path::new(invocation.argument("filepath")?);
        let target = normalize(invocation.target_directory());
        let path = if filepath.is_absolute() {
            filepath.to_path_buf()
        } else if invocation.variable("module").is_some() {
            invocation.module_directory()?.join(filepath)
        } else {
            invocation.target_directory().join(filepath)
        };
        let path = normalize(&path);

        if path == target || !path.starts_with(&target) {
            return Err(CommandError::file(
                &path,
                format!("is not in target directory \"{}\"", target.display()),
            ));
        }

        match fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "deleted file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "nothing to delete");
            }
            Err(e) => return Err(CommandError::file(&path, e.to_string())),
        }
        Ok(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
