//! `.gitignore` pattern matching
//!
//! Supplies the `is_ignored(path, is_dir)` predicate used by add and
//! status. Patterns are translated to anchored regexes: `*` matches within
//! a path segment, `**` crosses segments, `?` matches one character, a
//! leading `/` anchors to the repository root, a trailing `/` restricts
//! the pattern to directories, and `!` negates. Later patterns override
//! earlier ones.

use anyhow::Result;
use regex::Regex;
use std::path::Path;

#[derive(Debug)]
struct IgnorePattern {
    regex: Regex,
    negate: bool,
    dir_only: bool,
}

#[derive(Debug, Default)]
pub struct IgnoreRules {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreRules {
    /// Built-in ignores plus the repository root `.gitignore`, if present
    pub fn load(workdir: &Path) -> Result<Self> {
        let mut rules = IgnoreRules::default();

        for builtin in [".git/", "*.swp", "*.swo", ".DS_Store"] {
            rules.add_pattern(builtin)?;
        }

        let gitignore = workdir.join(".gitignore");
        if gitignore.exists() {
            let content = std::fs::read_to_string(&gitignore)?;
            rules.add_lines(&content)?;
        }

        Ok(rules)
    }

    /// Parse patterns from `.gitignore`-formatted text
    pub fn add_lines(&mut self, content: &str) -> Result<()> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            // a malformed pattern is skipped, not fatal
            let _ = self.add_pattern(line);
        }
        Ok(())
    }

    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        let mut pattern = pattern;
        let negate = if let Some(rest) = pattern.strip_prefix('!') {
            pattern = rest;
            true
        } else {
            false
        };
        let dir_only = if let Some(rest) = pattern.strip_suffix('/') {
            pattern = rest;
            true
        } else {
            false
        };

        let regex = Regex::new(&translate(pattern))?;
        self.patterns.push(IgnorePattern {
            regex,
            negate,
            dir_only,
        });
        Ok(())
    }

    /// Whether `path` (forward-slash relative) is ignored.
    ///
    /// Directory-only patterns never match files. The last matching
    /// pattern wins, so `!pattern` can un-ignore an earlier match.
    pub fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        let basename = path.rsplit('/').next().unwrap_or(path);
        let mut ignored = false;

        for pattern in &self.patterns {
            if pattern.dir_only && !is_dir {
                continue;
            }
            if pattern.regex.is_match(path) || pattern.regex.is_match(basename) {
                ignored = !pattern.negate;
            }
        }

        ignored
    }
}

/// Translate one gitignore pattern into an anchored regex
fn translate(pattern: &str) -> String {
    let mut escaped = regex::escape(pattern);

    // double-star first so single-star rewriting cannot eat it
    escaped = escaped.replace(r"\*\*/", "\u{1}");
    escaped = escaped.replace(r"\*\*", "\u{2}");
    escaped = escaped.replace(r"\*", "[^/]*");
    escaped = escaped.replace('\u{1}', "(?:.*/)?");
    escaped = escaped.replace('\u{2}', ".*");
    escaped = escaped.replace(r"\?", ".");

    if let Some(anchored) = escaped.strip_prefix('/') {
        format!("^{anchored}$")
    } else {
        format!("(^|/){escaped}$")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(patterns: &[&str]) -> IgnoreRules {
        let mut rules = IgnoreRules::default();
        for pattern in patterns {
            rules.add_pattern(pattern).unwrap();
        }
        rules
    }

    #[test]
    fn glob_matches_extension_anywhere() {
        let rules = rules(&["*.log"]);
        assert!(rules.is_ignored("test.log", false));
        assert!(rules.is_ignored("deep/dir/test.log", false));
        assert!(!rules.is_ignored("test.txt", false));
        assert!(!rules.is_ignored("log", false));
    }

    #[test]
    fn later_patterns_override_earlier_ones() {
        let layered = rules(&["*.log", "!important.log"]);
        assert!(layered.is_ignored("debug.log", false));
        assert!(!layered.is_ignored("important.log", false));

        let reversed = rules(&["!important.log", "*.log"]);
        assert!(reversed.is_ignored("important.log", false));
    }

    #[test]
    fn directory_only_patterns_never_match_files() {
        let rules = rules(&["build/"]);
        assert!(rules.is_ignored("build", true));
        assert!(!rules.is_ignored("build", false));
    }

    #[test]
    fn leading_slash_anchors_to_root() {
        let rules = rules(&["/target"]);
        assert!(rules.is_ignored("target", false));
        assert!(!rules.is_ignored("sub/target", false));
    }

    #[test]
    fn double_star_crosses_directories() {
        let rules = rules(&["docs/**/draft.md"]);
        assert!(rules.is_ignored("docs/draft.md", false));
        assert!(rules.is_ignored("docs/a/b/draft.md", false));
        assert!(!rules.is_ignored("src/draft.md", false));
    }

    #[test]
    fn question_mark_matches_one_character() {
        let rules = rules(&["file.?"]);
        assert!(rules.is_ignored("file.a", false));
        assert!(!rules.is_ignored("file.ab", false));
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        let mut rules = IgnoreRules::default();
        rules.add_lines("# comment\n\n*.tmp\n").unwrap();
        assert!(rules.is_ignored("a.tmp", false));
        assert!(!rules.is_ignored("# comment", false));
    }
}
