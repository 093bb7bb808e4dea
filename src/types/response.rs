use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Envelope for every JSON body the server produces that carries no data.
///
/// `code` mirrors the HTTP status; `message` is only set on errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommonResponse {
    pub code: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Same envelope as [`CommonResponse`] with a typed payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + DeserializeOwned")]
pub struct ResourceResponse<T: Serialize + DeserializeOwned> {
    pub code: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub data: Option<T>,
}
