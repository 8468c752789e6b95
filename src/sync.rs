use std::path::{Path, PathBuf};

use clap::ValueEnum;
use thiserror::Error;

use crate::config::Config;
use crate::store::{Store, TransferError};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Folder {} not found", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("No input files to download")]
    EmptyInputSet,
    #[error("No output files to upload")]
    EmptyOutputSet,
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// What a single invocation does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Upload the output folder for the submission.
    Upload,
    /// Clear previous outputs for the submission, then fetch the inputs.
    Download,
}

/// Runs one action end to end. The local folders are checked before the
/// store is touched.
pub async fn run(action: Action, config: &Config, store: &Store) -> Result<(), SyncError> {
    ensure_directories(config)?;

    match action {
        Action::Upload => {
            let uploaded = upload(config, store).await?;
            log::info!("uploaded {} files", uploaded);
        }
        Action::Download => {
            let deleted = purge(config, store).await?;
            let downloaded = download(config, store).await?;
            log::info!(
                "deleted {} previous outputs, downloaded {} inputs",
                deleted,
                downloaded
            );
        }
    }

    Ok(())
}

/// A local file found under the output folder and the object name it is
/// uploaded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub name: String,
}

/// Checks that both local folders exist before anything touches the network.
pub fn ensure_directories(config: &Config) -> Result<(), SyncError> {
    for folder in [&config.input_folder, &config.output_folder] {
        if !folder.exists() {
            return Err(SyncError::DirectoryNotFound(folder.clone()));
        }
    }
    Ok(())
}

/// Fetches every configured input object into the input folder, in list
/// order, stopping at the first failure.
pub async fn download(config: &Config, store: &Store) -> Result<usize, SyncError> {
    log::info!("Downloading assets from S3 bucket {}", store.bucket());

    if config.input_object_ids.is_empty() {
        return Err(SyncError::EmptyInputSet);
    }

    for id in &config.input_object_ids {
        log::info!("Downloading {}", id);
        store
            .fetch_to_file(&config.input_key(id), &config.input_folder.join(id))
            .await?;
    }

    Ok(config.input_object_ids.len())
}

/// Uploads the output folder under the submission's output prefix.
///
/// Files directly in the folder keep their name. Files one directory down are
/// flattened to `{dir}-{file}`. Anything deeper is skipped.
pub async fn upload(config: &Config, store: &Store) -> Result<usize, SyncError> {
    log::info!("Uploading assets to S3 bucket {}", store.bucket());

    let mut count = 0;
    for file in collect_output_files(&config.output_folder).await? {
        log::info!("Uploading {}", file.name);
        store
            .put_file(&file.path, &config.output_key(&file.name))
            .await?;
        count += 1;
    }

    if count == 0 {
        return Err(SyncError::EmptyOutputSet);
    }

    Ok(count)
}

/// Deletes every object already stored under the submission's output prefix.
pub async fn purge(config: &Config, store: &Store) -> Result<usize, SyncError> {
    log::info!(
        "Deleting all output files from S3 bucket {} for submission {}",
        store.bucket(),
        config.submission_id
    );

    let keys = store.list(&config.output_prefix()).await?;
    for key in &keys {
        log::info!("Deleting {}", key);
        store.delete(key).await?;
    }

    Ok(keys.len())
}

/// Enumerates the output folder one level deep, sorted by name.
pub async fn collect_output_files(root: &Path) -> Result<Vec<OutputFile>, TransferError> {
    let mut files = Vec::new();

    for (name, path) in sorted_entries(root).await? {
        if !is_dir(&path).await {
            files.push(OutputFile { path, name });
            continue;
        }

        log::info!("Entering folder: {}", name);
        for (inner, inner_path) in sorted_entries(&path).await? {
            if is_dir(&inner_path).await {
                log::warn!("Skipping nested folder {}", inner_path.display());
                continue;
            }
            files.push(OutputFile {
                path: inner_path,
                name: format!("{}-{}", name, inner),
            });
        }
    }

    Ok(files)
}

async fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>, TransferError> {
    let io_err = |source: std::io::Error| TransferError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut read_dir = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(io_err)? {
        entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    entries.sort();

    Ok(entries)
}

// follows symlinks; a dangling link counts as a file
async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}
