// src/discover/mod.rs

//! Test discovery.
//!
//! - [`task`] holds the immutable task descriptor handed to the pool.
//! - [`manifest`] expands a TOML suite manifest into named sub-tasks.
//!
//! Discovery is uniform over two kinds of sources: a plain file is one
//! opaque task ([`ExecutableSource`]), and a `.toml` file is a suite
//! manifest contributing several named sub-tasks
//! ([`manifest::ManifestSource`]). Both implement [`TaskSource`].

pub mod manifest;
pub mod task;

pub use manifest::ManifestSource;
pub use task::{RunOptions, Task};

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::{ConfigFile, RunSettings};
use crate::errors::Result;

/// A source of tasks.
///
/// Most test files are one opaque task each; a source that knows more
/// (e.g. a suite manifest) enumerates several named sub-tasks instead.
pub trait TaskSource {
    fn enumerate(&self) -> Result<Vec<Task>>;
}

/// One plain test file, run as a single task.
///
/// The command is the file itself, optionally prefixed with the
/// configured `runner` (e.g. an interpreter).
pub struct ExecutableSource {
    name: String,
    path: PathBuf,
    runner: Vec<String>,
    options: RunOptions,
}

impl ExecutableSource {
    pub fn new(name: String, path: PathBuf, runner: Vec<String>, options: RunOptions) -> Self {
        Self {
            name,
            path,
            runner,
            options,
        }
    }
}

impl TaskSource for ExecutableSource {
    fn enumerate(&self) -> Result<Vec<Task>> {
        let mut command = self.runner.clone();
        command.push(self.path.to_string_lossy().into_owned());

        Ok(vec![Task {
            name: self.name.clone(),
            command,
            options: self.options,
        }])
    }
}

/// Build the full task list for a run.
///
/// With an explicit `tests` list, each entry is resolved against `root`
/// and expanded. Otherwise `root` is scanned for files matching the
/// configured glob patterns minus excludes, sorted by name for a
/// deterministic submission order.
pub fn discover_tasks(
    root: &Path,
    explicit: &[String],
    cfg: &ConfigFile,
    settings: &RunSettings,
) -> Result<Vec<Task>> {
    let names: Vec<String> = if explicit.is_empty() {
        scan_dir(root, cfg)?
    } else {
        explicit.to_vec()
    };

    let options = RunOptions {
        timeout: settings.timeout,
        buffer_output: settings.buffer_output,
    };

    let mut tasks = Vec::new();
    for name in names {
        let path = resolve_path(root, &name);
        let source = source_for(&name, path, cfg, options)?;
        tasks.extend(source.enumerate()?);
    }

    debug!(count = tasks.len(), "discovered tasks");
    Ok(tasks)
}

/// Pick the right [`TaskSource`] for one discovered entry.
fn source_for(
    name: &str,
    path: PathBuf,
    cfg: &ConfigFile,
    options: RunOptions,
) -> Result<Box<dyn TaskSource>> {
    if path.extension().is_some_and(|ext| ext == "toml") {
        let source = ManifestSource::load(name.to_string(), &path, options)?;
        return Ok(Box::new(source));
    }

    Ok(Box::new(ExecutableSource::new(
        name.to_string(),
        path,
        cfg.default.runner.clone(),
        options,
    )))
}

fn resolve_path(root: &Path, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Scan `root` for file names matching the include globs and none of the
/// exclude globs, sorted.
fn scan_dir(root: &Path, cfg: &ConfigFile) -> Result<Vec<String>> {
    let include = build_glob_set(&cfg.default.pattern)?;
    let exclude = build_glob_set(&cfg.default.exclude)?;

    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if include.is_match(&name) && !exclude.is_match(&name) {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
