use std::collections::HashMap;
use std::path::PathBuf;

/// ## Include sources
///
/// Where `#include "name"` finds the text it pulls in. The host decides
/// what a name means.

pub trait Includes: std::fmt::Debug {
    fn fetch(&self, name: &str) -> Option<String>;
}

/// Refuses every include.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIncludes;

impl Includes for NoIncludes {
    fn fetch(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Files relative to a directory, usually the one holding the main script.
#[derive(Debug, Clone)]
pub struct IncludeDir {
    dir: PathBuf,
}

impl IncludeDir {
    pub fn new<P: Into<PathBuf>>(dir: P) -> IncludeDir {
        IncludeDir { dir: dir.into() }
    }
}

impl Includes for IncludeDir {
    fn fetch(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.join(name)).ok()
    }
}

impl Includes for HashMap<String, String> {
    fn fetch(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_dir() {
        let dir = std::env::temp_dir().join(format!("clu-include-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("lib.clu"), "a = 1;").unwrap();
        let inc = IncludeDir::new(&dir);
        assert_eq!(inc.fetch("lib.clu").as_deref(), Some("a = 1;"));
        assert_eq!(inc.fetch("missing.clu"), None);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
