#[derive(Debug, thiserror::Error)]
pub enum AllocError {
  #[error("out of memory: no room for a {requested} byte block")]
  OutOfMemory { requested: usize },

  #[error("{count} elements of {size} bytes overflow usize")]
  Overflow { count: usize, size: usize },

  #[error("invalid arena config: {0}")]
  InvalidConfig(String),
}

pub type Result<T, E = AllocError> = std::result::Result<T, E>;
