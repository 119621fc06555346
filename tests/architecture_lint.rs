//! Architecture enforcement tests.
//!
//! The metamodel reaches storage only through the `PersistenceAdapter`
//! trait. These tests keep filesystem access and concrete adapters out of
//! the model layer so that a new backend never needs model changes.
//!
//! # Test Categories
//!
//! 1. **Filesystem Access** - only adapters and config touch `std::fs`
//! 2. **Adapter Coupling** - the model names no concrete adapter outside tests,
//!    and core names neither the model nor the adapters
//! 3. **Panics** - library code propagates errors instead of unwrapping

use std::fs;
use std::path::{Path, PathBuf};

/// Directories allowed to use `std::fs` directly.
const FS_ALLOWED: &[&str] = &["src/adapter", "src/core/config"];

/// Concrete adapters the model layer must not name.
const CONCRETE_ADAPTERS: &[&str] = &["FileAdapter", "MemoryAdapter", "StoreLock", "StorePaths"];

/// Collect every `.rs` file below `dir`.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).unwrap_or_else(|_| panic!("Failed to read {}", dir.display())) {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// The part of a source file before its `#[cfg(test)]` module.
fn non_test_source(content: &str) -> &str {
    match content.find("#[cfg(test)]") {
        Some(pos) => &content[..pos],
        None => content,
    }
}

/// Lines of code, without comment lines.
fn code_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
}

fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// =============================================================================
// Filesystem Access
// =============================================================================

#[test]
fn only_adapters_and_config_touch_the_filesystem() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src")) {
        let name = display(&path);
        if FS_ALLOWED.iter().any(|dir| name.starts_with(dir)) {
            continue;
        }
        let content = fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", name));
        for (line_no, line) in code_lines(non_test_source(&content)) {
            if line.contains("std::fs") || line.contains("File::open") || line.contains("File::create") {
                violations.push(format!("{}:{}: {}", name, line_no, line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Filesystem access outside adapters and config:\n  {}",
        violations.join("\n  ")
    );
}

// =============================================================================
// Adapter Coupling
// =============================================================================

#[test]
fn model_depends_only_on_the_adapter_trait() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src/model")) {
        let name = display(&path);
        let content = fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", name));
        for (line_no, line) in code_lines(non_test_source(&content)) {
            for adapter in CONCRETE_ADAPTERS {
                if line.contains(adapter) {
                    violations.push(format!("{}:{}: names {}", name, line_no, adapter));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Model code coupled to a concrete adapter:\n  {}",
        violations.join("\n  ")
    );
}

/// Lines in `src/core` that name `module`.
fn core_references_to(module: &str) -> Vec<String> {
    let mut violations = Vec::new();
    for path in rust_files(Path::new("src/core")) {
        let name = display(&path);
        let content = fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", name));
        for (line_no, line) in code_lines(&content) {
            if line.contains(module) {
                violations.push(format!("{}:{}: {}", name, line_no, line.trim()));
            }
        }
    }
    violations
}

/// The core layer holds plain data and algorithms; it must not reach up
/// into the model.
#[test]
fn core_does_not_depend_on_model() {
    let violations = core_references_to("crate::model");
    assert!(
        violations.is_empty(),
        "Core depends on the model layer:\n  {}",
        violations.join("\n  ")
    );
}

/// Adapters convert their own errors into core errors, never the reverse.
#[test]
fn core_does_not_depend_on_adapter() {
    let violations = core_references_to("crate::adapter");
    assert!(
        violations.is_empty(),
        "Core depends on the adapter layer:\n  {}",
        violations.join("\n  ")
    );
}

// =============================================================================
// Panics
// =============================================================================

#[test]
fn library_code_does_not_unwrap() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src")) {
        let name = display(&path);
        let content = fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", name));
        for (line_no, line) in code_lines(non_test_source(&content)) {
            if line.contains(".unwrap()") || line.contains(".expect(") {
                violations.push(format!("{}:{}: {}", name, line_no, line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "unwrap/expect in library code:\n  {}",
        violations.join("\n  ")
    );
}
