use serde::Serialize;

/// Envelope wrapped around every successful response body.
#[derive(Debug, Serialize)]
pub struct ResponseData<T> {
    pub data: Option<T>,
}

impl<T> ResponseData<T> {
    pub fn new(data: T) -> Self {
        Self { data: Some(data) }
    }
}
