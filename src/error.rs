use thiserror::Error;

use crate::calendar::DateError;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("row {row} ({marketing_source}): invalid date '{value}'")]
    InvalidDate {
        row: usize,
        marketing_source: String,
        value: String,
        #[source]
        source: DateError,
    },
}
