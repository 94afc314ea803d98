//! Caller authorization context.
//!
//! Token verification happens upstream in the API Gateway authorizer. This
//! module only carries the verified claims down to the database, where
//! row-level security decides what the caller can read.

use serde_json::{Map, Value};

use crate::{Config, Error, Result};

/// The identity a request runs its queries under.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    role: String,
    subject: Option<String>,
    claims: Value,
}

impl SessionContext {
    /// Session for a caller without authorizer claims.
    pub fn anonymous(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            subject: None,
            claims: Value::Object(Map::new()),
        }
    }

    /// Session for a caller whose claims were verified by the authorizer.
    pub fn authenticated(role: impl Into<String>, claims: &Value) -> Result<Self> {
        let sub = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Auth("Missing sub claim".to_string()))?;

        let role = role.into();
        let mut claims = claims
            .as_object()
            .cloned()
            .ok_or_else(|| Error::Auth("Claims are not an object".to_string()))?;
        claims.insert("role".to_string(), Value::String(role.clone()));

        Ok(Self {
            role,
            subject: Some(sub.to_string()),
            claims: Value::Object(claims),
        })
    }

    /// Build the session from the authorizer claims, if any.
    pub fn from_authorizer_claims(config: &Config, claims: Option<&Value>) -> Result<Self> {
        match claims {
            Some(claims) => Self::authenticated(config.authenticated_role.clone(), claims),
            None => Ok(Self::anonymous(config.anon_role.clone())),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn claims(&self) -> &Value {
        &self.claims
    }
}
