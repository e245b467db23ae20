//! Compiled ignore rules.
//!
//! Decides whether a path under the watch root is excluded. Pure: no I/O,
//! no state beyond the compiled patterns.

use regex::Regex;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

use crate::utils::to_posix;

/// Compiled form of an `IgnoreConfig`, anchored at a root directory.
#[derive(Debug)]
pub struct IgnoreMatcher {
    root: PathBuf,
    dirs: FxHashSet<PathBuf>,
    files: FxHashSet<PathBuf>,
    regexes: Vec<Regex>,
}

impl IgnoreMatcher {
    pub fn new(root: &Path, dirs: &[String], files: &[String], regexes: Vec<Regex>) -> Self {
        Self {
            root: root.to_path_buf(),
            dirs: dirs.iter().map(PathBuf::from).collect(),
            files: files.iter().map(PathBuf::from).collect(),
            regexes,
        }
    }

    /// Whether `path` should be excluded from watching and dispatch.
    ///
    /// The decision runs on the root-relative form of `path`:
    /// 1. not under the root (or the root itself) ⇒ ignored
    /// 2. the relative path or any of its ancestors names an excluded
    ///    directory ⇒ ignored (a directory match prunes its whole subtree)
    /// 3. the relative path names an excluded file ⇒ ignored
    /// 4. any regex matches the POSIX-normalized relative path ⇒ ignored
    ///
    /// `is_dir` is advisory; directory rules also exclude files beneath the
    /// matched directory via the ancestor walk.
    pub fn should_ignore(&self, path: &Path, _is_dir: bool) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return true;
        };
        if rel.as_os_str().is_empty() || rel == Path::new(".") {
            return true;
        }

        for ancestor in rel.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            if self.dirs.contains(ancestor) {
                return true;
            }
        }

        if self.files.contains(rel) {
            return true;
        }

        let rel_str = to_posix(rel);
        self.regexes.iter().any(|regex| regex.is_match(&rel_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IgnoreConfig;

    fn matcher(dirs: &[&str], files: &[&str], regex: &[&str]) -> IgnoreMatcher {
        let config = IgnoreConfig {
            dirs: dirs.iter().map(|s| s.to_string()).collect(),
            files: files.iter().map(|s| s.to_string()).collect(),
            regex: regex.iter().map(|s| s.to_string()).collect(),
        };
        config.compile(Path::new("/project")).unwrap()
    }

    #[test]
    fn test_outside_root_ignored() {
        let m = matcher(&[], &[], &[]);
        assert!(m.should_ignore(Path::new("/elsewhere/file.rs"), false));
        assert!(m.should_ignore(Path::new("/project"), true));
    }

    #[test]
    fn test_dir_rule_prunes_subtree() {
        let m = matcher(&["node_modules"], &[], &[]);
        assert!(m.should_ignore(Path::new("/project/node_modules"), true));
        assert!(m.should_ignore(Path::new("/project/node_modules/pkg/index.js"), false));
        assert!(!m.should_ignore(Path::new("/project/src/index.js"), false));
    }

    #[test]
    fn test_dir_rule_is_component_wise() {
        let m = matcher(&["dist"], &[], &[]);
        assert!(m.should_ignore(Path::new("/project/dist/app.js"), false));
        // "distance" shares a prefix string but not a component
        assert!(!m.should_ignore(Path::new("/project/distance/app.js"), false));
    }

    #[test]
    fn test_nested_dir_rule() {
        let m = matcher(&["src/generated"], &[], &[]);
        assert!(m.should_ignore(Path::new("/project/src/generated/api.rs"), false));
        assert!(!m.should_ignore(Path::new("/project/src/api.rs"), false));
    }

    #[test]
    fn test_file_rule_exact_match_only() {
        let m = matcher(&[], &["config.lock"], &[]);
        assert!(m.should_ignore(Path::new("/project/config.lock"), false));
        assert!(!m.should_ignore(Path::new("/project/sub/config.lock"), false));
        assert!(!m.should_ignore(Path::new("/project/config.lock2"), false));
    }

    #[test]
    fn test_regex_rule() {
        let m = matcher(&[], &[], &[r"^.+\.sqlite$"]);
        assert!(m.should_ignore(Path::new("/project/app.sqlite"), false));
        assert!(m.should_ignore(Path::new("/project/data/app.sqlite"), false));
        assert!(!m.should_ignore(Path::new("/project/app.sql"), false));
    }

    #[test]
    fn test_default_dotfile_regex() {
        let config = crate::config::Config::default();
        let m = config.exclude.compile(Path::new("/project")).unwrap();

        assert!(m.should_ignore(Path::new("/project/.git"), true));
        assert!(m.should_ignore(Path::new("/project/src/.hidden"), false));
        assert!(m.should_ignore(Path::new("/project/node_modules"), true));
        assert!(!m.should_ignore(Path::new("/project/internal"), true));
        assert!(!m.should_ignore(Path::new("/project/cmd/main.rs"), false));
    }
}
