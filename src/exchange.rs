//! Verbatim import and export of structure text.

use std::fs;

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::templates;

const EXPORT_EXTENSION: &str = "json";

/// Read a structure file as-is.
pub fn import(path: &Utf8Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading structure file {}", path))
}

/// `dest`, with `.json` appended unless it already carries that suffix.
pub fn export_path(dest: &Utf8Path) -> Utf8PathBuf {
    let has_suffix = dest
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXPORT_EXTENSION));
    if has_suffix {
        dest.to_owned()
    } else {
        Utf8PathBuf::from(format!("{}.{}", dest, EXPORT_EXTENSION))
    }
}

/// Write `text` unchanged and return the path actually written.
pub fn export(dest: &Utf8Path, text: &str, force: bool) -> Result<Utf8PathBuf> {
    let target = export_path(dest);
    if target.exists() && !force {
        bail!("{} already exists; rerun with --force to overwrite", target);
    }
    templates::write_to(&target, text.as_bytes())?;
    info!(path = %target, bytes = text.len(), "exported structure");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_appended_once() {
        assert_eq!(export_path(Utf8Path::new("out/layout")), "out/layout.json");
        assert_eq!(export_path(Utf8Path::new("layout.JSON")), "layout.JSON");
        assert_eq!(export_path(Utf8Path::new("layout.txt")), "layout.txt.json");
    }

    #[test]
    fn text_round_trips_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let text = "# not json\n  Alpha \n\n{\"Beta\": [\n";

        let written = export(&root.join("saved").join("layout"), text, false).unwrap();
        assert_eq!(written, root.join("saved").join("layout.json"));
        assert_eq!(import(&written).unwrap(), text);
    }

    #[test]
    fn existing_export_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let dest = root.join("layout.json");

        export(&dest, "[\"a\"]", false).unwrap();
        let err = export(&dest, "[\"b\"]", false).unwrap_err();
        assert!(err.to_string().contains("--force"));

        export(&dest, "[\"b\"]", true).unwrap();
        assert_eq!(import(&dest).unwrap(), "[\"b\"]");
    }

    #[test]
    fn missing_import_names_the_file() {
        let err = import(Utf8Path::new("/no/such/structure.json")).unwrap_err();
        assert!(err.to_string().contains("/no/such/structure.json"));
    }
}
