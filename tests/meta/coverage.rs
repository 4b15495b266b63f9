//! Layout checks for the test tree: every source module has a unit test file
//! compiled into the `unit` target, and every test file holds tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    const SRC: &str = "src";
    const UNIT: &str = "tests/unit";

    /// `.rs` files below `dir`, relative to it, with `/` separators
    fn rust_files(dir: &Path) -> io::Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in fs::read_dir(&current)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext == "rs") {
                    let relative = path
                        .strip_prefix(dir)
                        .map_err(|err| io::Error::other(err.to_string()))?;
                    files.insert(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(files)
    }

    fn is_module_root(relative: &str) -> bool {
        relative == "lib.rs" || relative == "main.rs" || relative.ends_with("mod.rs")
    }

    /// Names declared with `mod name;` in a module file
    fn declared_modules(file: &Path) -> io::Result<Vec<String>> {
        let content = fs::read_to_string(file)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter_map(|line| {
                let line = line.strip_prefix("pub ").unwrap_or(line);
                line.strip_prefix("mod ")?.strip_suffix(';')
            })
            .map(str::to_owned)
            .collect())
    }

    /// Files reachable through `mod` declarations from `tests/unit/mod.rs`
    fn reachable_unit_files() -> io::Result<BTreeSet<String>> {
        let root = Path::new(UNIT);
        let mut reachable = BTreeSet::from(["mod.rs".to_owned()]);
        let mut pending = vec![(PathBuf::new(), root.join("mod.rs"))];

        while let Some((prefix, file)) = pending.pop() {
            for name in declared_modules(&file)? {
                let leaf = prefix.join(format!("{name}.rs"));
                let nested = prefix.join(&name).join("mod.rs");
                if root.join(&leaf).is_file() {
                    reachable.insert(leaf.to_string_lossy().replace('\\', "/"));
                } else if root.join(&nested).is_file() {
                    reachable.insert(nested.to_string_lossy().replace('\\', "/"));
                    pending.push((prefix.join(&name), root.join(&nested)));
                }
            }
        }
        Ok(reachable)
    }

    // Tests every source module has a unit test file at the mirrored path
    // Verified by deleting tests/unit/io/archive.rs
    #[test]
    fn test_every_module_has_unit_tests() {
        let src = rust_files(Path::new(SRC)).unwrap();
        let unit = rust_files(Path::new(UNIT)).unwrap();

        let missing: Vec<&String> = src
            .iter()
            .filter(|path| !is_module_root(path) && !unit.contains(*path))
            .collect();
        assert!(
            missing.is_empty(),
            "source modules without unit tests: {missing:?}"
        );
    }

    // Tests no unit test file outlives the module it covers
    // Verified by adding tests/unit/io/unused.rs
    #[test]
    fn test_every_unit_file_has_a_module() {
        let src = rust_files(Path::new(SRC)).unwrap();
        let unit = rust_files(Path::new(UNIT)).unwrap();

        let orphaned: Vec<&String> = unit
            .iter()
            .filter(|path| !path.ends_with("mod.rs") && !src.contains(*path))
            .collect();
        assert!(
            orphaned.is_empty(),
            "unit test files without a source module: {orphaned:?}"
        );
    }

    // Tests every unit test file is compiled into the unit target
    // Verified by dropping `mod state;` from tests/unit/session/mod.rs
    #[test]
    fn test_every_unit_file_is_declared() {
        let unit = rust_files(Path::new(UNIT)).unwrap();
        let reachable = reachable_unit_files().unwrap();

        let undeclared: Vec<&String> = unit.difference(&reachable).collect();
        assert!(
            undeclared.is_empty(),
            "unit test files no `mod` declaration reaches: {undeclared:?}"
        );
    }

    // Tests every test file outside module roots defines a test
    // Verified by removing the tests from tests/unit/render/contrast.rs
    #[test]
    fn test_every_test_file_has_tests() {
        let tests = Path::new("tests");
        let empty: Vec<String> = rust_files(tests)
            .unwrap()
            .into_iter()
            .filter(|path| !path.ends_with("mod.rs"))
            .filter(|path| {
                fs::read_to_string(tests.join(path))
                    .map(|content| !content.contains("#[test]"))
                    .unwrap_or(true)
            })
            .collect();
        assert!(empty.is_empty(), "test files without tests: {empty:?}");
    }
}
