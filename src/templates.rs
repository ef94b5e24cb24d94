use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use tracing::{info, warn};

#[derive(RustEmbed)]
#[folder = "templates"]
struct Templates;

const STRUCTURE_PREFIX: &str = "structures/";
const USER_EXTENSIONS: [&str; 2] = ["json", "txt"];

pub fn get_bytes(path: &str) -> Result<Vec<u8>> {
    let file = Templates::get(path).ok_or_else(|| anyhow!("embedded template `{}` missing", path))?;
    Ok(file.data.as_ref().to_vec())
}

pub fn get_string(path: &str) -> Result<String> {
    let bytes = get_bytes(path)?;
    String::from_utf8(bytes).with_context(|| format!("decoding embedded template `{}`", path))
}

pub fn write_to(destination: &Utf8Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }
    fs::write(destination, bytes).with_context(|| format!("writing {}", destination))
}

pub fn write_template(destination: &Utf8Path, template: &str) -> Result<()> {
    let bytes = get_bytes(template)?;
    write_to(destination, &bytes)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TemplateSource {
    Builtin,
    User,
}

impl TemplateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateSource::Builtin => "builtin",
            TemplateSource::User => "user",
        }
    }
}

#[derive(Clone, Debug)]
enum Origin {
    Embedded(String),
    File(Utf8PathBuf),
}

#[derive(Clone, Debug)]
pub struct TemplateEntry {
    pub name: String,
    pub source: TemplateSource,
    origin: Origin,
}

/// Named structure templates: the embedded set plus an optional user directory.
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    entries: BTreeMap<String, TemplateEntry>,
}

impl TemplateLibrary {
    pub fn load(user_dir: Option<&Utf8Path>) -> Result<Self> {
        let mut library = Self::default();
        for path in Templates::iter() {
            let Some(file) = path.strip_prefix(STRUCTURE_PREFIX) else {
                continue;
            };
            let Some(name) = Utf8Path::new(file).file_stem() else {
                continue;
            };
            library.insert(TemplateEntry {
                name: name.to_owned(),
                source: TemplateSource::Builtin,
                origin: Origin::Embedded(path.to_string()),
            });
        }

        if let Some(dir) = user_dir {
            library.load_user_dir(dir)?;
        }
        Ok(library)
    }

    fn load_user_dir(&mut self, dir: &Utf8Path) -> Result<()> {
        if !dir.is_dir() {
            warn!(dir = %dir, "template directory does not exist; using built-in templates only");
            return Ok(());
        }

        let mut loaded = 0usize;
        for entry in dir
            .read_dir_utf8()
            .with_context(|| format!("reading template directory {}", dir))?
        {
            let entry = entry.with_context(|| format!("reading template directory {}", dir))?;
            let path = entry.path();
            let usable = path
                .extension()
                .is_some_and(|ext| USER_EXTENSIONS.contains(&ext));
            if !usable || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_stem() else {
                continue;
            };
            self.insert(TemplateEntry {
                name: name.to_owned(),
                source: TemplateSource::User,
                origin: Origin::File(path.to_owned()),
            });
            loaded += 1;
        }
        info!(dir = %dir, templates = loaded, "loaded user templates");
        Ok(())
    }

    fn insert(&mut self, entry: TemplateEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &TemplateEntry> {
        self.entries.values()
    }

    pub fn get(&self, name: &str) -> Option<&TemplateEntry> {
        self.entries.get(name)
    }

    /// Raw text of the named template.
    pub fn read(&self, name: &str) -> Result<String> {
        let Some(entry) = self.get(name) else {
            let available: Vec<&str> = self.entries.keys().map(String::as_str).collect();
            bail!(
                "unknown template `{}`; available: {}",
                name,
                available.join(", ")
            );
        };

        match &entry.origin {
            Origin::Embedded(path) => get_string(path),
            Origin::File(path) => {
                fs::read_to_string(path).with_context(|| format!("reading template {}", path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{StructureNode, parse_strict};

    #[test]
    fn builtin_templates_are_valid_json() {
        let library = TemplateLibrary::load(None).unwrap();
        let names: Vec<_> = library.entries().map(|entry| entry.name.as_str()).collect();
        assert!(names.contains(&"example"));
        assert!(names.contains(&"rust-project"));

        for entry in library.entries() {
            let raw = library.read(&entry.name).unwrap();
            let node = parse_strict(&raw).unwrap();
            assert!(matches!(node, StructureNode::Group(_)), "{}", entry.name);
        }
    }

    #[test]
    fn user_templates_override_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("example.txt"), "Only\nThese\n").unwrap();
        fs::write(root.join("clients.json"), "[\"Acme\"]").unwrap();
        fs::write(root.join("notes.md"), "ignored").unwrap();

        let library = TemplateLibrary::load(Some(&root)).unwrap();
        assert_eq!(library.get("example").unwrap().source, TemplateSource::User);
        assert_eq!(library.read("example").unwrap(), "Only\nThese\n");
        assert_eq!(library.get("clients").unwrap().source, TemplateSource::User);
        assert!(library.get("notes").is_none());
        assert_eq!(
            library.get("media-library").unwrap().source,
            TemplateSource::Builtin
        );
    }

    #[test]
    fn missing_user_dir_falls_back_to_builtins() {
        let library = TemplateLibrary::load(Some(Utf8Path::new("/definitely/not/here"))).unwrap();
        assert!(library.get("example").is_some());
    }

    #[test]
    fn unknown_template_lists_available_names() {
        let library = TemplateLibrary::load(None).unwrap();
        let err = library.read("nope").unwrap_err().to_string();
        assert!(err.contains("unknown template `nope`"));
        assert!(err.contains("school-term"));
    }
}
