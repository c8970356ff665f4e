//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub scene: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub scene: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "newPassword")]
    pub new_password: Option<String>,
}

/// Envelope for the verification-code endpoints: `code` 0 is success, the
/// 1xxx/2xxx values carry the business failure kind.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CodeResponse {
    pub code: u16,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub username: String,
    pub roles: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn register_request_tolerates_missing_email() -> Result<()> {
        let decoded: RegisterRequest =
            serde_json::from_str(r#"{"username":"alice","password":"hunter22"}"#)?;
        assert_eq!(decoded.username, "alice");
        assert_eq!(decoded.email, None);
        Ok(())
    }

    #[test]
    fn reset_password_request_uses_camel_case_field() -> Result<()> {
        let decoded: ResetPasswordRequest = serde_json::from_str(
            r#"{"email":"alice@example.com","code":"123456","newPassword":"hunter22"}"#,
        )?;
        assert_eq!(decoded.new_password.as_deref(), Some("hunter22"));

        let value = serde_json::to_value(&decoded)?;
        let renamed = value
            .get("newPassword")
            .and_then(serde_json::Value::as_str)
            .context("missing newPassword")?;
        assert_eq!(renamed, "hunter22");
        Ok(())
    }

    #[test]
    fn send_code_request_round_trips() -> Result<()> {
        let request = SendCodeRequest {
            email: Some("alice@example.com".to_string()),
            scene: Some("reset_password".to_string()),
        };
        let value = serde_json::to_value(&request)?;
        let decoded: SendCodeRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.email.as_deref(), Some("alice@example.com"));
        assert_eq!(decoded.scene.as_deref(), Some("reset_password"));
        Ok(())
    }

    #[test]
    fn code_response_serializes_envelope() -> Result<()> {
        let response = CodeResponse {
            code: 0,
            message: "Verification code sent".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(value.get("code").and_then(serde_json::Value::as_u64), Some(0));
        Ok(())
    }
}
