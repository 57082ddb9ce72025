//! Loading of the `.env` file that supplies the node URL and credentials.

use {std::path::PathBuf, thiserror::Error};

#[derive(Debug, Error)]
#[error("failed to load environment file")]
pub struct Error(#[from] dotenvy::Error);

/// Loads the first `.env` file found in the working directory or one of its
/// ancestors into the process environment.
///
/// Variables that are already set are not overridden. A missing file is not an
/// error; a file that exists but cannot be parsed is.
pub fn load_env_file() -> Result<Option<PathBuf>, Error> {
    loaded(dotenvy::dotenv())
}

fn loaded(result: dotenvy::Result<PathBuf>) -> Result<Option<PathBuf>, Error> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}
