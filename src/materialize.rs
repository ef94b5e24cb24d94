use std::fmt::Write as _;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::structure::StructureNode;

/// Create every folder described by `node` under `base`.
///
/// Groups create one folder per key and recurse into it. Lists create one
/// folder per name and expand nested groups at the same level. `on_create` is
/// called once per addressed folder, whether it was created or already there.
/// The walk stops at the first error; folders created before it are kept.
pub fn materialize<F>(base: &Utf8Path, node: &StructureNode, mut on_create: F) -> Result<()>
where
    F: FnMut(&Utf8Path),
{
    info!(base = %base, "materializing structure");
    let mut count = 0usize;
    walk(base, node, &mut |path| {
        create_dir(path)?;
        debug!(path = %path, "folder ready");
        on_create(path);
        count += 1;
        Ok(())
    })?;
    info!(base = %base, folders = count, "structure materialized");
    Ok(())
}

/// Collect the folders `materialize` would address, in the same order,
/// without touching the filesystem.
pub fn plan(base: &Utf8Path, node: &StructureNode) -> Result<Vec<Utf8PathBuf>> {
    let mut paths = Vec::new();
    walk(base, node, &mut |path| {
        paths.push(path.to_owned());
        Ok(())
    })?;
    Ok(paths)
}

/// Render planned paths as an indented outline relative to `base`.
pub fn format_outline(base: &Utf8Path, paths: &[Utf8PathBuf]) -> String {
    let mut out = String::new();
    for path in paths {
        let relative = path.strip_prefix(base).unwrap_or(path);
        let depth = relative.components().count().saturating_sub(1);
        let name = path.file_name().unwrap_or(path.as_str());
        let _ = writeln!(out, "{}- {}/", "  ".repeat(depth), name);
    }
    out
}

/// Whether `name` can be joined onto a parent without escaping or aliasing it.
pub fn is_single_segment(name: &str) -> bool {
    if name.trim().is_empty() || name == "." || name == ".." {
        return false;
    }
    if name.contains(['/', '\\', '\0']) {
        return false;
    }
    !(cfg!(windows) && name.contains(':'))
}

type Visit<'a> = dyn FnMut(&Utf8Path) -> Result<()> + 'a;

fn walk(base: &Utf8Path, node: &StructureNode, visit: &mut Visit<'_>) -> Result<()> {
    match node {
        StructureNode::Group(entries) => {
            for (name, child) in entries {
                let child_path = join_segment(base, name)?;
                visit(&child_path)?;
                walk(&child_path, child, visit)?;
            }
            Ok(())
        }
        StructureNode::List(items) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    StructureNode::Atom(name) => {
                        let child_path = join_segment(base, name)?;
                        visit(&child_path)?;
                    }
                    StructureNode::Group(_) => walk(base, item, visit)?,
                    other => {
                        return Err(Error::UnsupportedNode {
                            path: base.to_owned(),
                            found: format!("{} at list position {}", other.kind(), index),
                        });
                    }
                }
            }
            Ok(())
        }
        other => Err(Error::UnsupportedNode {
            path: base.to_owned(),
            found: other.kind(),
        }),
    }
}

fn join_segment(parent: &Utf8Path, name: &str) -> Result<Utf8PathBuf> {
    if !is_single_segment(name) {
        return Err(Error::InvalidName {
            parent: parent.to_owned(),
            name: name.to_owned(),
        });
    }
    Ok(parent.join(name))
}

fn create_dir(path: &Utf8Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| Error::Filesystem {
        path: path.to_owned(),
        source,
    })
}
