// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload staging: directory copy and tar(.gz) extraction.
//!
//! Nothing staged may point outside the payload root. Entry paths must be
//! relative without `..`, and link targets may only climb with leading `..`
//! components, never above the payload root.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path};

use cloudway_core::CloudwayError;
use flate2::read::GzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Copies `source` into `dest`, which must already exist.
///
/// Symlinks are recreated as symlinks on unix and skipped elsewhere.
pub fn copy_dir(source: &Path, dest: &Path) -> Result<(), CloudwayError> {
    copy_tree(source, dest, 0)
}

fn copy_tree(source: &Path, dest: &Path, depth: usize) -> Result<(), CloudwayError> {
    for entry in std::fs::read_dir(source).map_err(CloudwayError::io)? {
        let entry = entry.map_err(CloudwayError::io)?;
        let file_type = entry.file_type().map_err(CloudwayError::io)?;
        let target = dest.join(entry.file_name());

        if file_type.is_dir() {
            std::fs::create_dir(&target).map_err(CloudwayError::io)?;
            copy_tree(&entry.path(), &target, depth + 1)?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path()).map_err(CloudwayError::io)?;
            if !is_contained_link(depth, &link) {
                return Err(escape_error(&entry.path(), &link));
            }
            #[cfg(unix)]
            std::os::unix::fs::symlink(link, &target).map_err(CloudwayError::io)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(CloudwayError::io)?;
        }
    }
    Ok(())
}

/// Extracts a tar archive, gzip-compressed or not, into `dest`.
///
/// Any entry that would land or point outside `dest` fails the whole
/// extraction.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), CloudwayError> {
    let mut file = File::open(archive).map_err(CloudwayError::io)?;

    let mut magic = [0u8; 2];
    let read = file.read(&mut magic).map_err(CloudwayError::io)?;
    file.seek(SeekFrom::Start(0)).map_err(CloudwayError::io)?;

    let reader = BufReader::new(file);
    if read == 2 && magic == GZIP_MAGIC {
        unpack(tar::Archive::new(GzDecoder::new(reader)), dest)
    } else {
        unpack(tar::Archive::new(reader), dest)
    }
}

fn unpack<R: Read>(mut archive: tar::Archive<R>, dest: &Path) -> Result<(), CloudwayError> {
    archive.set_preserve_permissions(true);

    for entry in archive.entries().map_err(CloudwayError::io)? {
        let mut entry = entry.map_err(CloudwayError::io)?;
        let path = entry.path().map_err(CloudwayError::io)?.into_owned();

        if !is_safe_entry(&path) {
            return Err(CloudwayError::Validation(format!(
                "archive entry `{}` escapes the plugin directory",
                path.display()
            )));
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let link = entry
                .link_name()
                .map_err(CloudwayError::io)?
                .map(|l| l.into_owned())
                .unwrap_or_default();
            // Hard link targets are archive-relative, symlinks are relative
            // to the directory holding the link.
            let contained = if entry_type.is_hard_link() {
                !link.as_os_str().is_empty() && is_safe_entry(&link)
            } else {
                is_contained_link(parent_depth(&path), &link)
            };
            if !contained {
                return Err(escape_error(&path, &link));
            }
        }

        if !entry.unpack_in(dest).map_err(CloudwayError::io)? {
            return Err(CloudwayError::Validation(format!(
                "archive entry `{}` escapes the plugin directory",
                path.display()
            )));
        }
    }
    Ok(())
}

fn is_safe_entry(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Number of directories between the payload root and the entry at `path`.
fn parent_depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
        .saturating_sub(1)
}

/// Whether a link `depth` directories below the root stays under the root.
///
/// `..` is accepted only as a leading run, so the climb never passes
/// through another link.
fn is_contained_link(depth: usize, link: &Path) -> bool {
    let mut climbed = 0;
    let mut descended = false;
    for component in link.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if !descended => climbed += 1,
            Component::Normal(_) => descended = true,
            _ => return false,
        }
    }
    !link.as_os_str().is_empty() && climbed <= depth
}

fn escape_error(path: &Path, link: &Path) -> CloudwayError {
    CloudwayError::Validation(format!(
        "link `{}` -> `{}` escapes the plugin directory",
        path.display(),
        link.display()
    ))
}
