//! Paths never loaded into the sandbox
//!
//! Dependency caches, VCS internals, build output and lockfiles are large
//! and can be regenerated inside the sandbox.

/// Directory names skipped wherever they appear
pub const SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    ".turbo",
    ".vercel",
    "dist",
    "build",
    "out",
    "coverage",
    ".cache",
];

/// Lockfiles skipped wherever they appear
pub const SKIP_FILES: &[&str] = &["package-lock.json", "yarn.lock", "pnpm-lock.yaml", "bun.lockb"];

/// Whether `path` should be left out of a load.
///
/// `extra` entries without a slash match any segment by name; entries with
/// a slash match as a path prefix.
pub fn should_skip(path: &str, extra: &[String]) -> bool {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((file_name, dirs)) = segments.split_last() else {
        return true;
    };

    if dirs.iter().any(|dir| SKIP_DIRS.contains(dir)) || SKIP_FILES.contains(file_name) {
        return true;
    }

    extra.iter().any(|pattern| {
        let pattern = pattern.trim_matches('/');
        if pattern.is_empty() {
            false
        } else if pattern.contains('/') {
            path == pattern || path.starts_with(&format!("{}/", pattern))
        } else {
            segments.contains(&pattern)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_dependency_and_build_dirs() {
        assert!(should_skip("node_modules/react/index.js", &[]));
        assert!(should_skip("packages/ui/node_modules/x.js", &[]));
        assert!(should_skip(".git/HEAD", &[]));
        assert!(should_skip(".next/cache/a", &[]));
        assert!(should_skip("dist/bundle.js", &[]));
    }

    #[test]
    fn test_skips_lockfiles() {
        assert!(should_skip("package-lock.json", &[]));
        assert!(should_skip("apps/web/pnpm-lock.yaml", &[]));
        assert!(should_skip("yarn.lock", &[]));
    }

    #[test]
    fn test_keeps_source_files() {
        assert!(!should_skip("src/app/page.tsx", &[]));
        assert!(!should_skip("package.json", &[]));
        // A file merely named like a skipped directory is kept
        assert!(!should_skip("src/build", &[]));
        assert!(!should_skip("lib/distance.ts", &[]));
    }

    #[test]
    fn test_extra_patterns() {
        let extra = vec!["vendor".to_string(), "public/videos".to_string()];
        assert!(should_skip("vendor/lib.js", &extra));
        assert!(should_skip("public/videos/intro.mp4", &extra));
        assert!(!should_skip("public/images/logo.png", &extra));
        assert!(!should_skip("public/videos-old/a.mp4", &extra));
    }
}
