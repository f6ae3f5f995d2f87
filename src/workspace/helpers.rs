//! Helper utilities for the workspace module.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pathdiff::diff_paths;

/// Normalized spelling of a script path: lowercase, forward slashes, no
/// leading `./` and no `.`/`..` segments.
pub fn normalize_script_path(raw: &str) -> String {
    let unified = raw.trim().trim_matches('"').replace('\\', "/").to_ascii_lowercase();
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// The script path the engine would use for `path`: relative to the
/// workspace root and normalized.
pub fn get_script_path(root_dir: &Path, path: &Path) -> Option<String> {
    let relative = if path.is_absolute() && root_dir.is_absolute() {
        diff_paths(path, root_dir)?
    } else {
        path.strip_prefix(root_dir).unwrap_or(path).to_path_buf()
    };
    relative.to_str().map(normalize_script_path)
}

/// Lookup table from normalized script path to the tracked file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptTable {
    root_dir: PathBuf,
    paths: HashMap<String, PathBuf>,
}

impl ScriptTable {
    pub fn new<'a>(root_dir: &Path, files: impl IntoIterator<Item = &'a PathBuf>) -> ScriptTable {
        let paths = files
            .into_iter()
            .filter_map(|path| Some((get_script_path(root_dir, path)?, path.clone())))
            .collect();
        ScriptTable {
            root_dir: root_dir.to_path_buf(),
            paths,
        }
    }

    /// Resolve a raw path against tracked files, first as written relative to
    /// the workspace root, then relative to the directory of `from`.
    pub fn resolve(&self, raw: &str, from: Option<&Path>) -> Option<&PathBuf> {
        if let Some(path) = self.paths.get(&normalize_script_path(raw)) {
            return Some(path);
        }
        let from_dir = from?.parent()?;
        let joined = from_dir.join(raw.trim().trim_matches('"'));
        let key = get_script_path(&self.root_dir, &joined)?;
        self.paths.get(&key)
    }

    /// Like [`ScriptTable::resolve`], then falls back to checking the
    /// filesystem. A failing filesystem check resolves to nothing.
    pub fn resolve_on_disk(&self, raw: &str, from: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = self.resolve(raw, from) {
            return Some(path.clone());
        }
        let trimmed = raw.trim().trim_matches('"');
        let mut candidates = vec![self.root_dir.join(trimmed)];
        if let Some(from_dir) = from.and_then(Path::parent) {
            candidates.push(from_dir.join(trimmed));
        }
        candidates.into_iter().find(|candidate| candidate.is_file())
    }

    pub fn script_path(&self, path: &Path) -> String {
        get_script_path(&self.root_dir, path).unwrap_or_else(|| path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_case_and_separator_insensitive() {
        assert_eq!(
            normalize_script_path("Global\\Spawner.SCR"),
            "global/spawner.scr"
        );
        assert_eq!(normalize_script_path("./maps/../global/a.scr"), "global/a.scr");
        assert_eq!(normalize_script_path("\"global/a.scr\""), "global/a.scr");
    }

    #[test]
    fn script_path_is_relative_to_root() {
        let root = PathBuf::from("/game/main");
        let path = PathBuf::from("/game/main/global/spawner.scr");
        assert_eq!(
            get_script_path(&root, &path),
            Some("global/spawner.scr".to_string())
        );
    }

    #[test]
    fn resolution_falls_back_to_including_directory() {
        let root = PathBuf::from("/game");
        let files = vec![
            PathBuf::from("/game/maps/dm/helper.scr"),
            PathBuf::from("/game/global/util.scr"),
        ];
        let table = ScriptTable::new(&root, &files);

        assert_eq!(
            table.resolve("global/util.scr", None),
            Some(&files[1])
        );
        assert_eq!(
            table.resolve("helper.scr", Some(Path::new("/game/maps/dm/level.scr"))),
            Some(&files[0])
        );
        assert_eq!(table.resolve("helper.scr", None), None);
    }
}
