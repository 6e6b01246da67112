//! The fixed ignore set for codebase enumeration (§4.4)

use std::path::Path;

const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    ".next",
    "out",
    "__tests__",
];

const IGNORED_FILES: &[&str] = &["tsconfig.tsbuildinfo", "bun.lock", "package-lock.json", "yarn.lock"];

/// True if `path` should be excluded from indexing, relative to `root`.
///
/// Everything under `.locus/` is ignored except `.locus/artifacts/**`, since
/// artifacts are themselves LLM-authored project content.
pub fn is_ignored(path: &Path, root: &Path) -> bool {
    let relative = match path.strip_prefix(root) {
        Ok(r) => r,
        Err(_) => return false,
    };

    if relative.as_os_str().is_empty() {
        return false;
    }

    let components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    if components.first().map(String::as_str) == Some(".locus") {
        return components.get(1).map(String::as_str) != Some("artifacts");
    }

    if components.iter().any(|c| IGNORED_DIRS.contains(&c.as_str())) {
        return true;
    }

    if let Some(name) = components.last() {
        if IGNORED_FILES.contains(&name.as_str()) {
            return true;
        }
        if name.ends_with(".d.ts") || is_test_file(name) {
            return true;
        }
    }

    false
}

fn is_test_file(name: &str) -> bool {
    for marker in [".test.", ".spec."] {
        if name.contains(marker) {
            return true;
        }
    }
    false
}
