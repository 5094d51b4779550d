use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] argus_ingest::IngestError),

    #[error(transparent)]
    Classify(#[from] argus_classify::ClassifyError),

    #[error(transparent)]
    Db(#[from] argus_db::DbError),
}
