use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Recognition engine not initialized: {0}")]
    EngineNotInitialized(String),

    #[error("Recognition failed: {0}")]
    Recognition(String),
}

impl Error {
    /// Fatal errors are setup problems the caller must fix; everything else
    /// is scoped to a single record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::EngineNotInitialized(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
