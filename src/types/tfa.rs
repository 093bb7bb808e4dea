use serde::{Deserialize, Serialize};

/// Returned by a successful primary login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub user: String,

    pub tfa_required: bool,

    /// Path of the verification form, only present when a second factor is
    /// required. Stays valid until the user's next primary login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_path: Option<String>,
}

/// Content of the guarded verification form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TfaFormResponse {
    pub user: String,

    /// Plugin that validates the submitted second factor.
    pub validate_plugin: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub login_plugins: Vec<String>,
}
