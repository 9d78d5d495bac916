use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use serde_json::Value;
use tracing::Span;

use crate::error::{LdError, Result};
use crate::resource::{document_key, KeyedResource};
use crate::upsert::upsert_resource;

/// Upsert each document in order. Item N+1 starts only after item N has
/// completed; the first failure aborts the batch.
pub async fn upsert_sequential<R>(resource: &R, documents: &[Value], span: &Span) -> Result<Vec<Value>>
where
    R: KeyedResource + ?Sized,
{
    check_keys(documents)?;
    let mut results = Vec::with_capacity(documents.len());
    for document in documents {
        let key = document_key(document)?;
        results.push(upsert_resource(resource, key, document, span).await?);
    }
    Ok(results)
}

/// Upsert all documents concurrently. Results keep the input order; the first
/// failure fails the batch. No concurrency cap.
pub async fn upsert_parallel<R>(resource: &R, documents: &[Value], span: &Span) -> Result<Vec<Value>>
where
    R: KeyedResource + ?Sized,
{
    check_keys(documents)?;
    try_join_all(documents.iter().map(|document| async move {
        let key = document_key(document)?;
        upsert_resource(resource, key, document, span).await
    }))
    .await
}

/// Reject the whole batch up front if any document lacks a key.
fn check_keys(documents: &[Value]) -> Result<()> {
    documents.iter().try_for_each(|d| document_key(d).map(drop))
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| LdError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content)
        .map_err(|e| LdError::validation(format!("{} is not valid JSON: {}", path.display(), e)))
}

/// Documents of a bulk-load file holding a JSON array.
pub fn read_bulk_file(path: &Path) -> Result<Vec<Value>> {
    match read_json(path)? {
        Value::Array(items) => Ok(items),
        _ => Err(LdError::validation(format!(
            "{} must contain a JSON array",
            path.display()
        ))),
    }
}

/// Documents of every `*.json` file in `dir`, in file-name order. A file may
/// hold an array of documents or a single document.
pub fn read_bulk_folder(dir: &Path) -> Result<Vec<Value>> {
    let io_err = |source| LdError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_err)?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut documents = Vec::new();
    for file in &files {
        match read_json(file)? {
            Value::Array(items) => documents.extend(items),
            single => documents.push(single),
        }
    }
    Ok(documents)
}
