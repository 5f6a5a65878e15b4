//! Admin "add user" form: field state, validation and submission.

use std::{collections::BTreeMap, time::Duration};

use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use shared::{domain::Role, error::ApiError, protocol::NewUserRequest};
use tracing::{info, warn};

use crate::{config::ClientSettings, error::FetchError, error::FormError};

pub const ADD_USER_PATH: &str = "/api/v1/auth/add-user";
pub const USER_LIST_ROUTE: &str = "/admin/users";
const MIN_PASSWORD_LEN: usize = 6;

/// Raw form state keyed by field name. Updates merge into what is already
/// there; nothing typed so far is ever dropped by an unrelated edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddUserForm {
    fields: BTreeMap<String, String>,
}

impl AddUserForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn reset(&mut self) {
        self.fields.clear();
    }

    fn trimmed(&self, name: &str) -> &str {
        self.field(name).map(str::trim).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<NewUserRequest, FormError> {
        let username = self.trimmed("username");
        if username.is_empty() {
            return Err(FormError::validation("username", "is required"));
        }

        let email = self.trimmed("email");
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(FormError::validation("email", "must be an email address"));
        }

        let password = self.field("password").unwrap_or_default();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::validation(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        let role = match self.trimmed("role") {
            "" => Role::default(),
            raw => serde_json::from_value(Value::String(raw.to_ascii_lowercase()))
                .map_err(|_| FormError::validation("role", format!("unknown role '{raw}'")))?,
        };

        Ok(NewUserRequest {
            username: username.to_string(),
            email: email.to_string(),
            phone_number: self.trimmed("phoneNumber").to_string(),
            password: password.to_string(),
            role,
        })
    }
}

/// Where the caller's router should go after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
}

pub struct UserAdminClient {
    http: Client,
    server_url: String,
}

impl UserAdminClient {
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        Self::new(settings.server_url.clone(), settings.request_timeout())
    }

    /// Validates and posts the form. Invalid input never reaches the network.
    pub async fn add_user(&self, form: &AddUserForm) -> Result<Redirect, FormError> {
        let request = form.validate()?;
        let response = self
            .http
            .post(format!("{}{ADD_USER_PATH}", self.server_url))
            .json(&request)
            .send()
            .await
            .map_err(FetchError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = ApiError::from_response_body(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %detail, "add user rejected");
            return Err(FetchError::Status {
                status: status.as_u16(),
                detail,
            }
            .into());
        }

        info!(username = %request.username, "user created");
        Ok(Redirect {
            to: USER_LIST_ROUTE.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
