//! Local mirror of the signed-in user's profile
//!
//! The identity provider is the source of truth; this record is overwritten
//! on every login so the client can render offline.

use crate::storage::collection::Record;
use crate::storage::schema::{self, CollectionSchema};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            _ => Err(Error::InvalidRecord(format!("Unknown role: {}", s))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cached user profile. Only `id` is guaranteed; profiles written by older
/// clients may lack any of the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    pub fn is_student(&self) -> bool {
        self.role == Some(Role::Student)
    }

    /// Name for display, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl Record for User {
    fn schema() -> &'static CollectionSchema {
        &schema::USERS
    }

    fn primary_key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidRecord("user id must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_profile() {
        let user: User = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(user.display_name(), "abc");
        assert!(!user.is_student());
    }

    #[test]
    fn test_role_spelling() {
        let user = User::new("u1", "Asha", Role::Student).with_grade("5");
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "student");
        assert_eq!(value["grade"], "5");
        assert!(value.get("avatar").is_none());
        assert_eq!("Teacher".parse::<Role>().unwrap(), Role::Teacher);
    }
}
