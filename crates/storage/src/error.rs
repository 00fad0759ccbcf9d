#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("postgres error: {0}")]
    Postgres(String),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("embedding table segment_embeddings_{0} does not exist (production mode forbids auto-create)")]
    MissingEmbeddingTable(usize),
    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl From<tokio_postgres::Error> for StorageError {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Postgres(e.to_string())
    }
}
