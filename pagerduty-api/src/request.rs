use serde::{de::DeserializeOwned, Serialize};
use std::borrow::Cow;

pub use reqwest::Method;

/// Payload attached to a request.
pub enum RequestData<T> {
    Empty,
    Query(T),
    Json(T),
}

pub trait Request {
    type Data: Serialize;
    type Response: DeserializeOwned;

    const METHOD: Method = Method::GET;

    fn endpoint(&self) -> Cow<'_, str>;

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Empty
    }
}
