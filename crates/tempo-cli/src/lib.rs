//! The batch driver: expand the input set, pre-scan every unit into the
//! shared symbol table, rewrite one unit at a time, and write the results.
//! A unit that fails is skipped whole; the batch continues.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

use tempo_core::PackageName;
use tempo_resolve::{builtin_symbols, collect_unit, SymbolTable};
use tempo_syntax::CompilationUnit;
use tempo_transform::{RewriteOptions, RewriteSession};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitKind {
    Java,
    Json,
}

impl EmitKind {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            EmitKind::Java => "java",
            EmitKind::Json => "json",
        }
    }
}

#[derive(Debug)]
pub struct BatchConfig {
    /// Tree files, directories, or `@listfile` indirections.
    pub inputs: Vec<String>,
    /// External symbol tables layered under the batch's own summaries.
    pub symbol_tables: Vec<PathBuf>,
    /// Package prefix applied to rewritten output.
    pub prefix: Option<String>,
    /// Output root directory; `None` writes to stdout.
    pub output_root: Option<PathBuf>,
    pub overwrite: bool,
    /// Where to record the rewritten class names.
    pub config_out: Option<PathBuf>,
    pub emit: EmitKind,
    pub rewrite_static_fields: bool,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    pub rewritten_classes: Vec<String>,
}

/// Expand file names, directories and `@listfile` indirections into the
/// ordered list of tree files.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if let Some(list_name) = input.strip_prefix('@') {
            let list_path = Path::new(list_name);
            let listing = fs::read_to_string(list_path)
                .with_context(|| format!("cannot read list file `{list_name}`"))?;
            let base = list_path.parent().unwrap_or(Path::new("."));
            for line in listing.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    files.push(base.join(line));
                }
            }
            continue;
        }

        let path = PathBuf::from(input);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(&path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| p.extension().is_some_and(|e| e == "json"))
                .collect();
            files.append(&mut found);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

/// Load and merge the external symbol tables under the built-in core set.
pub fn load_symbols(paths: &[PathBuf]) -> Result<SymbolTable> {
    let mut symbols = builtin_symbols();
    for path in paths {
        let json = fs::read_to_string(path)
            .with_context(|| format!("cannot read symbol table `{}`", path.display()))?;
        let table = SymbolTable::from_json(&json)
            .with_context(|| format!("malformed symbol table `{}`", path.display()))?;
        symbols.merge(table);
    }
    Ok(symbols)
}

/// Run the whole batch. Fail-closed per unit: an erroring unit produces no
/// output and the batch moves on.
pub fn run(config: &BatchConfig) -> Result<BatchReport> {
    let files = expand_inputs(&config.inputs)?;
    if files.is_empty() {
        bail!("no input tree files");
    }

    let mut symbols = load_symbols(&config.symbol_tables)?;

    // Pre-scan: every unit's summaries and class names are visible to every
    // other unit before the first rewrite starts. Unreadable or malformed
    // inputs fail closed here.
    let mut report = BatchReport::default();
    let mut units: Vec<(PathBuf, CompilationUnit)> = Vec::new();
    let mut known = Vec::new();
    for path in files {
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) => {
                warn!(file = %path.display(), %err, "skipping unreadable input");
                report.failed += 1;
                continue;
            }
        };
        match serde_json::from_str::<CompilationUnit>(&json) {
            Ok(unit) => {
                for summary in collect_unit(&unit) {
                    known.push(summary.name.as_str().to_string());
                    symbols.insert(summary);
                }
                units.push((path, unit));
            }
            Err(err) => {
                warn!(file = %path.display(), %err, "skipping malformed tree");
                report.failed += 1;
            }
        }
    }

    let options = RewriteOptions {
        rewrite_static_fields: config.rewrite_static_fields,
        package_prefix: config.prefix.as_deref().map(PackageName::from_dotted),
        known_cross_analyzed: known,
    };

    for (path, mut unit) in units {
        info!(file = %path.display(), "transforming");
        let mut session = RewriteSession::new(symbols.clone(), options.clone());
        match session.rewrite(&mut unit) {
            Ok(outcome) => {
                write_output(config, &path, &unit)?;
                report
                    .rewritten_classes
                    .extend(outcome.rewritten_classes.iter().map(|c| c.as_str().to_string()));
                report.processed += 1;
            }
            Err(err) => {
                error!(file = %path.display(), %err, "rewrite aborted, nothing written");
                report.failed += 1;
            }
        }
    }

    if let Some(config_out) = &config.config_out {
        let mut classes = report.rewritten_classes.clone();
        classes.sort();
        let json = serde_json::to_string_pretty(&classes)?;
        fs::write(config_out, json)
            .with_context(|| format!("cannot write config `{}`", config_out.display()))?;
    }

    Ok(report)
}

fn write_output(config: &BatchConfig, input: &Path, unit: &CompilationUnit) -> Result<()> {
    let rendered = match config.emit {
        EmitKind::Java => tempo_syntax::emit::unit_to_source(unit),
        EmitKind::Json => {
            let mut json = serde_json::to_string_pretty(unit)?;
            json.push('\n');
            json
        }
    };

    let Some(root) = &config.output_root else {
        print!("{rendered}");
        return Ok(());
    };

    let mut dir = root.clone();
    if let Some(package) = &unit.package {
        for segment in package.segments() {
            dir.push(segment);
        }
    }
    fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create output directory `{}`", dir.display()))?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Rewritten");
    let out = dir.join(format!("{stem}.{}", config.emit.extension()));

    if out.exists() && !config.overwrite {
        warn!(file = %out.display(), "exists, not overwriting");
        return Ok(());
    }

    fs::write(&out, rendered).with_context(|| format!("cannot write `{}`", out.display()))?;
    Ok(())
}
