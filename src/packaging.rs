use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{DeployerError, Result};

/// Entries skipped when packaging a directory: version control, bytecode
/// caches, OS metadata, dependency directories.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "__pycache__",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    ".DS_Store",
    "node_modules",
];

/// Create a deployment package (zip) for a function, writing it to the
/// current directory as `<name>-deployment.zip`.
pub fn create_deployment_package(function_path: &Path, exclude: &[&str]) -> Result<PathBuf> {
    let output_dir = std::env::current_dir()?;
    create_deployment_package_in(&output_dir, function_path, exclude)
}

/// Create a deployment package in `output_dir`, overwriting any existing
/// archive of the same name.
///
/// The source is mirrored into a temporary staging directory first (applying
/// exclusions), then compressed. The staging directory is removed on every
/// exit path, success or error.
pub fn create_deployment_package_in(
    output_dir: &Path,
    function_path: &Path,
    exclude: &[&str],
) -> Result<PathBuf> {
    let abs_path = function_path
        .canonicalize()
        .map_err(|_| DeployerError::InvalidPath(function_path.to_path_buf()))?;
    let function_name = abs_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DeployerError::InvalidPath(function_path.to_path_buf()))?
        .to_string();

    let staging = tempfile::tempdir()?;

    if abs_path.is_file() {
        let file_name = abs_path
            .file_name()
            .ok_or_else(|| DeployerError::InvalidPath(function_path.to_path_buf()))?;
        copy_with_metadata(&abs_path, &staging.path().join(file_name))?;
    } else if abs_path.is_dir() {
        copy_directory(&abs_path, staging.path(), exclude)?;
    } else {
        return Err(DeployerError::InvalidPath(function_path.to_path_buf()));
    }

    let zip_path = output_dir.join(format!("{function_name}-deployment.zip"));
    create_zip_from_dir(staging.path(), &zip_path)?;

    info!("Created deployment package at {}", zip_path.display());
    Ok(zip_path)
}

/// Check a path against the exclusion patterns.
///
/// A pattern starting with `*` matches by file-extension suffix; any other
/// pattern matches if it appears as a substring anywhere in the full path.
/// Deliberately coarse, not glob semantics.
fn should_exclude(path: &str, exclude: &[&str]) -> bool {
    exclude.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix('*') {
            path.ends_with(suffix)
        } else {
            path.contains(pattern)
        }
    })
}

/// Mirror a directory tree into the staging area, pruning excluded entries.
/// Excluding a directory skips its whole subtree.
fn copy_directory(source: &Path, target: &Path, exclude: &[&str]) -> Result<()> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let source_path = entry.path();

        if should_exclude(&source_path.to_string_lossy(), exclude) {
            continue;
        }

        let target_path = target.join(entry.file_name());
        if source_path.is_dir() {
            fs::create_dir_all(&target_path)?;
            copy_directory(&source_path, &target_path, exclude)?;
        } else {
            copy_with_metadata(&source_path, &target_path)?;
        }
    }
    Ok(())
}

/// Copy a file into the staging area keeping its metadata. `fs::copy`
/// carries permissions already; timestamps are applied separately, best
/// effort where the platform supports it.
fn copy_with_metadata(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)?;

    let Ok(metadata) = fs::metadata(source) else {
        return Ok(());
    };
    let mut times = fs::FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(file) = File::options().write(true).open(target) {
        let _ = file.set_times(times);
    }
    Ok(())
}

fn create_zip_from_dir(source_dir: &Path, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    add_directory_entries(&mut zip, source_dir, source_dir, options)?;
    zip.finish()?;
    Ok(())
}

fn add_directory_entries(
    zip: &mut ZipWriter<File>,
    root: &Path,
    dir: &Path,
    options: SimpleFileOptions,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            add_directory_entries(zip, root, &path, options)?;
        } else {
            // Entry names are relative to the staging root so the staging
            // prefix never leaks into the archive.
            let arcname = path.strip_prefix(root).unwrap_or(&path);
            zip.start_file(arcname.to_string_lossy().into_owned(), options)?;
            let mut source = File::open(&path)?;
            std::io::copy(&mut source, zip)?;
        }
    }
    Ok(())
}
