use thiserror::Error;

/// Why a single dump line could not be turned into a record.
///
/// These never abort a phase; the pipeline logs them and moves on.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("no JSON object found in line")]
    MissingObject,

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field `{field}` should be {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unparseable timestamp `{value}`: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: time::error::Parse,
    },
}

pub type RecordResult<A> = std::result::Result<A, RecordError>;
