use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively lists regular files under `folder` whose extension matches
/// `extension` (with or without the leading dot, case-insensitive), sorted.
pub fn discover_files(folder: &Path, extension: &str) -> Vec<PathBuf> {
    let wanted = extension.trim_start_matches('.');
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted));

        if matches {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[cfg(test)]
mod tests {
    use super::discover_files;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_recursive_and_case_insensitive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        fs::write(base.join("a.txt"), b"alpha")?;
        fs::write(nested.join("B.TXT"), b"beta")?;
        fs::write(base.join("c.pdf"), b"%PDF-1.4\n%fake")?;

        let files = discover_files(base, ".txt");
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|path| path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))));

        assert_eq!(discover_files(base, "pdf").len(), 1);
        Ok(())
    }

    #[test]
    fn jpg_does_not_match_jpeg() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("photo.jpeg"), b"x")?;

        assert!(discover_files(dir.path(), ".jpg").is_empty());
        assert_eq!(discover_files(dir.path(), ".jpeg").len(), 1);
        Ok(())
    }

    #[test]
    fn missing_folder_yields_nothing() {
        assert!(discover_files(std::path::Path::new("/definitely/not/here"), ".txt").is_empty());
    }
}
