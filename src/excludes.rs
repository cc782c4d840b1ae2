//! Compiled exclude patterns.
//!
//! Each `--exclude` argument becomes a full-match (`^...$`) regex, routed to
//! either the name-matcher list (bare name, checked against each path
//! component) or the path-matcher list (a pattern starting with `/`, checked
//! against the walk-root-relative path). Unless dotfiles were opted back in,
//! an implicit `^\.` name pattern prunes them the way a shell glob would.

use regex::Regex;

use crate::error::Result;
use crate::walker::ExcludePredicate;

pub struct CompiledExcludes {
    name_excludes: Vec<Regex>,
    path_excludes: Vec<Regex>,
}

impl CompiledExcludes {
    /// Build matchers from raw `--exclude` strings. A pattern beginning with
    /// `/` is anchored to the root-relative path; otherwise it matches a bare
    /// name at any depth. `include_dots` disables the implicit `^\.` rule.
    pub fn compile(raw_excludes: &[String], include_dots: bool) -> Result<Self> {
        let mut name_excludes = Vec::new();
        let mut path_excludes = Vec::new();

        for raw in raw_excludes {
            if let Some(stripped) = raw.strip_prefix('/') {
                let anchored = format!("^{}$", stripped.trim_matches('/'));
                path_excludes.push(Regex::new(&anchored)?);
            } else {
                let anchored = format!("^{}$", raw.trim_matches('/'));
                name_excludes.push(Regex::new(&anchored)?);
            }
        }

        if !include_dots {
            name_excludes.push(Regex::new(r"^\.").expect("static pattern"));
        }

        Ok(Self { name_excludes, path_excludes })
    }
}

impl ExcludePredicate for CompiledExcludes {
    fn is_excluded(&self, name: &str, rel_path: &str, _is_dir: bool) -> bool {
        if self.name_excludes.iter().any(|r| r.is_match(name)) {
            return true;
        }
        self.path_excludes.iter().any(|r| r.is_match(rel_path))
    }
}
