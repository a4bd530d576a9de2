/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Civil dates (no time component), e.g. the date a request is needed by.
pub type Date = chrono::NaiveDate;
