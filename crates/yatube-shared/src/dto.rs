//! Form payloads - what the HTML forms submit, and how each field is checked.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Field name to error messages, as shown next to each form field.
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// Flatten validator output into per-field messages.
pub fn form_errors(errors: &ValidationErrors) -> FormErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn valid_username(value: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !value.chars().all(allowed) {
        return Err(ValidationError::new("username_chars"));
    }
    Ok(())
}

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Create/edit post form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Enter the text of the post."))]
    pub text: String,
    /// Group id as submitted by the group select; empty means no group.
    #[serde(default)]
    pub group: Option<String>,
    /// Media path or URL of an illustration.
    #[serde(default)]
    pub image: Option<String>,
}

impl PostForm {
    /// Prefill the form with an existing post.
    pub fn with_values(text: &str, group: Option<Uuid>, image: Option<&str>) -> Self {
        Self {
            text: text.to_string(),
            group: group.map(|id| id.to_string()),
            image: image.map(ToString::to_string),
        }
    }

    /// The selected group, `Ok(None)` when none was chosen.
    pub fn group_id(&self) -> Result<Option<Uuid>, String> {
        match blank_to_none(&self.group) {
            None => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| "Select a valid choice.".to_string()),
        }
    }

    pub fn image_path(&self) -> Option<String> {
        blank_to_none(&self.image).map(ToString::to_string)
    }
}

/// Comment form on the post detail page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Enter a comment."))]
    pub text: String,
}

/// Login form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "This field is required."))]
    pub username: String,
    #[serde(default, skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Account registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Use between 1 and 150 characters."),
        custom(
            function = "valid_username",
            message = "Use letters, digits and @/./+/-/_ only."
        )
    )]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default, skip_serializing)]
    #[validate(length(min = 8, message = "The password must contain at least 8 characters."))]
    pub password1: String,
    #[serde(default, skip_serializing)]
    #[validate(must_match(other = "password1", message = "The two password fields didn't match."))]
    pub password2: String,
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_form_rejects_blank_text() {
        let form = PostForm {
            text: "   ".to_string(),
            ..Default::default()
        };
        let errors = form_errors(&form.validate().unwrap_err());
        assert_eq!(errors["text"], vec!["Enter the text of the post."]);
    }

    #[test]
    fn test_post_form_group_parsing() {
        let id = Uuid::new_v4();
        let mut form = PostForm::with_values("text", Some(id), None);
        assert_eq!(form.group_id(), Ok(Some(id)));

        form.group = Some(String::new());
        assert_eq!(form.group_id(), Ok(None));

        form.group = Some("not-a-uuid".to_string());
        assert!(form.group_id().is_err());
    }

    #[test]
    fn test_post_form_deserializes_without_optional_fields() {
        let form: PostForm = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert!(form.validate().is_ok());
        assert_eq!(form.group_id(), Ok(None));
        assert_eq!(form.image_path(), None);
    }

    #[test]
    fn test_image_path_is_trimmed() {
        let form = PostForm {
            text: "t".to_string(),
            group: None,
            image: Some("  posts/cat.png ".to_string()),
        };
        assert_eq!(form.image_path().as_deref(), Some("posts/cat.png"));
    }

    #[test]
    fn test_signup_form_rules() {
        let valid = SignupForm {
            username: "leo.tolstoy".to_string(),
            email: "leo@example.com".to_string(),
            password1: "war-and-peace".to_string(),
            password2: "war-and-peace".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid = SignupForm {
            username: "no spaces".to_string(),
            email: "nope".to_string(),
            password1: "short".to_string(),
            password2: "other".to_string(),
        };
        let errors = form_errors(&invalid.validate().unwrap_err());
        for field in ["username", "email", "password1", "password2"] {
            assert!(errors.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/create/")), Some("/create/"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(None), None);
    }
}
