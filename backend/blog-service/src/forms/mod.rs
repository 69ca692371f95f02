/// Form binding and validation
///
/// Each form binds from a `FormPayload`, validates with `validator` and
/// reports problems as `FormErrors` keyed by field name. A failed form is
/// re-rendered with its submitted values, so forms are `Serialize`
/// (password fields excepted).
pub mod payload;

pub use payload::{
    FormPayload, UploadedFile, MAX_FORM_BYTES, MAX_MULTIPART_BYTES, MAX_UPLOAD_BYTES,
};

use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::db::BlogStore;
use crate::error::Result;
use crate::models::PostView;
use crate::services::UploadedImage;

/// Key used for errors that belong to the form as a whole
pub const NON_FIELD_ERRORS: &str = "__all__";

const REQUIRED: &str = "This field is required.";

/// Validation messages per field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = FormErrors::new();
        for (field, field_errors) in errors.field_errors() {
            let field = field.to_string();
            for error in field_errors.iter() {
                let message = match &error.message {
                    Some(message) => message.to_string(),
                    None => default_message(&error.code),
                };
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

fn default_message(code: &str) -> String {
    match code {
        "email" => "Enter a valid email address.".to_string(),
        "length" => "Ensure this value has a valid length.".to_string(),
        other => format!("Invalid value ({}).", other),
    }
}

fn validate_errors<T: Validate>(form: &T) -> FormErrors {
    match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(errors) => errors.into(),
    }
}

/// JSON shape shared by every rendered form
pub fn render<T: Serialize>(form: &T, errors: &FormErrors) -> serde_json::Value {
    serde_json::json!({
        "data": form,
        "errors": errors,
        "has_errors": !errors.is_empty(),
    })
}

// ----- field validators -----

fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED)))
    } else {
        Ok(())
    }
}

fn validate_optional_id(value: &str) -> std::result::Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.parse::<i64>().is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_choice").with_message(Cow::Borrowed(
            "Select a valid choice. That choice is not one of the available choices.",
        )))
    }
}

fn validate_username(value: &str) -> std::result::Result<(), ValidationError> {
    validate_not_blank(value)?;
    let valid = value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username").with_message(Cow::Borrowed(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        )))
    }
}

fn validate_optional_email(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() || value.trim().validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email")
            .with_message(Cow::Borrowed("Enter a valid email address.")))
    }
}

// ============================================================================
// Post form
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct PostForm {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    /// Raw group id; empty selects no group
    #[validate(custom(function = "validate_optional_id"))]
    pub group: String,
    /// Current image URL when editing
    pub image: Option<String>,
    #[serde(skip)]
    pub upload: Option<UploadedFile>,
    #[serde(skip)]
    pub clear_image: bool,
}

/// Post form that passed validation
#[derive(Debug, Clone)]
pub struct CleanedPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<UploadedImage>,
    pub clear_image: bool,
}

impl PostForm {
    pub fn bind(mut payload: FormPayload) -> Self {
        Self {
            text: payload.text("text"),
            group: payload.text("group"),
            image: None,
            upload: payload.take_file("image"),
            clear_image: payload.flag("image-clear"),
        }
    }

    /// Form prefilled from an existing post
    pub fn initial(post: &PostView, image_url: Option<String>) -> Self {
        Self {
            text: post.text.clone(),
            group: post
                .group
                .as_ref()
                .map(|g| g.id.to_string())
                .unwrap_or_default(),
            image: image_url,
            upload: None,
            clear_image: false,
        }
    }

    /// Validate fields, resolve the group and decode the upload
    pub async fn clean(
        &self,
        store: &dyn BlogStore,
    ) -> Result<std::result::Result<CleanedPost, FormErrors>> {
        let mut errors = validate_errors(self);

        let mut group_id = None;
        if !errors.contains("group") {
            if let Ok(id) = self.group.trim().parse::<i64>() {
                if store.find_group(id).await?.is_some() {
                    group_id = Some(id);
                } else {
                    errors.add(
                        "group",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                }
            }
        }

        if self.upload.is_some() && self.clear_image {
            errors.add(
                "image",
                "Please either submit a file or check the clear checkbox, not both.",
            );
        }

        let image = match &self.upload {
            Some(file) => match UploadedImage::inspect(file.bytes.clone()) {
                Ok(image) => Some(image),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        Ok(Ok(CleanedPost {
            text: self.text.trim().to_string(),
            group_id,
            image,
            clear_image: self.clear_image,
        }))
    }
}

// ============================================================================
// Comment form
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct CommentForm {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
}

impl CommentForm {
    pub fn bind(payload: &FormPayload) -> Self {
        Self {
            text: payload.text("text"),
        }
    }

    pub fn errors(&self) -> FormErrors {
        validate_errors(self)
    }
}

// ============================================================================
// Account forms
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct SignupForm {
    #[validate(
        length(max = 150, message = "Ensure this value has at most 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[serde(skip_serializing)]
    #[validate(length(
        min = 8,
        message = "This password is too short. It must contain at least 8 characters."
    ))]
    pub password1: String,
    #[serde(skip_serializing)]
    #[validate(custom(function = "validate_not_blank"))]
    pub password2: String,
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(custom(function = "validate_optional_email"))]
    pub email: String,
}

impl SignupForm {
    pub fn bind(payload: &FormPayload) -> Self {
        Self {
            username: payload.text("username").trim().to_string(),
            password1: payload.text("password1"),
            password2: payload.text("password2"),
            first_name: payload.text("first_name").trim().to_string(),
            last_name: payload.text("last_name").trim().to_string(),
            email: payload.text("email").trim().to_string(),
        }
    }

    /// Field validation plus the password confirmation check
    pub fn errors(&self) -> FormErrors {
        let mut errors = validate_errors(self);
        if !errors.contains("password2") && self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }
        errors
    }

    pub fn email(&self) -> Option<String> {
        if self.email.is_empty() {
            None
        } else {
            Some(self.email.clone())
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct LoginForm {
    #[validate(custom(function = "validate_not_blank"))]
    pub username: String,
    #[serde(skip_serializing)]
    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,
    pub next: String,
}

impl LoginForm {
    pub fn bind(payload: &FormPayload) -> Self {
        Self {
            username: payload.text("username").trim().to_string(),
            password: payload.text("password"),
            next: payload.text("next"),
        }
    }

    pub fn errors(&self) -> FormErrors {
        validate_errors(self)
    }
}

/// Accept only same-site absolute paths as a post-login target
pub fn safe_next(next: &str) -> Option<&str> {
    let next = next.trim();
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    local.then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewGroup;

    fn payload(pairs: &[(&str, &str)]) -> FormPayload {
        FormPayload::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn blank_comment_is_invalid() {
        let form = CommentForm::bind(&payload(&[("text", "   ")]));
        let errors = form.errors();
        assert_eq!(errors.get("text").unwrap(), [REQUIRED.to_string()]);

        let form = CommentForm::bind(&payload(&[("text", "nice post")]));
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn post_form_requires_text() {
        let store = MemoryStore::new();
        let form = PostForm::bind(payload(&[("text", ""), ("group", "")]));

        let errors = form.clean(&store).await.unwrap().unwrap_err();
        assert!(errors.contains("text"));
        assert!(!errors.contains("group"));
    }

    #[tokio::test]
    async fn post_form_rejects_unknown_group() {
        let store = MemoryStore::new();
        let form = PostForm::bind(payload(&[("text", "hello"), ("group", "77")]));

        let errors = form.clean(&store).await.unwrap().unwrap_err();
        assert!(errors.contains("group"));

        let form = PostForm::bind(payload(&[("text", "hello"), ("group", "cats")]));
        let errors = form.clean(&store).await.unwrap().unwrap_err();
        assert!(errors.contains("group"));
    }

    #[tokio::test]
    async fn post_form_resolves_group() {
        let store = MemoryStore::new();
        let group = store
            .create_group(NewGroup {
                title: "Cats".into(),
                slug: "cats".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        let form = PostForm::bind(payload(&[
            ("text", "hello"),
            ("group", &group.id.to_string()),
        ]));

        let cleaned = form.clean(&store).await.unwrap().unwrap();
        assert_eq!(cleaned.group_id, Some(group.id));
        assert!(cleaned.image.is_none());
        assert!(!cleaned.clear_image);
    }

    #[tokio::test]
    async fn post_form_strips_surrounding_whitespace() {
        let store = MemoryStore::new();
        let form = PostForm::bind(payload(&[("text", "  \n hello world \t "), ("group", "")]));

        let cleaned = form.clean(&store).await.unwrap().unwrap();
        assert_eq!(cleaned.text, "hello world");
    }

    #[test]
    fn rendered_form_reports_errors() {
        let mut errors = FormErrors::new();
        let clean = render(&CommentForm::default(), &errors);
        assert_eq!(clean["has_errors"], false);

        errors.add("text", REQUIRED);
        let failed = render(&CommentForm::default(), &errors);
        assert_eq!(failed["has_errors"], true);
        assert_eq!(failed["errors"]["text"][0], REQUIRED);
    }

    #[tokio::test]
    async fn post_form_rejects_non_image_upload() {
        let store = MemoryStore::new();
        let form = PostForm::bind(payload(&[("text", "hello")]).with_file(
            "image",
            UploadedFile {
                filename: "notes.txt".into(),
                bytes: b"plain text".to_vec(),
            },
        ));

        let errors = form.clean(&store).await.unwrap().unwrap_err();
        assert!(errors.contains("image"));
    }

    #[test]
    fn signup_checks_password_confirmation() {
        let form = SignupForm::bind(&payload(&[
            ("username", "leo"),
            ("password1", "long-enough-1"),
            ("password2", "long-enough-2"),
        ]));
        let errors = form.errors();
        assert!(errors.contains("password2"));
        assert!(!errors.contains("password1"));
    }

    #[test]
    fn signup_rejects_short_password_and_bad_username() {
        let form = SignupForm::bind(&payload(&[
            ("username", "bad name!"),
            ("password1", "short"),
            ("password2", "short"),
            ("email", "not-an-email"),
        ]));
        let errors = form.errors();
        assert!(errors.contains("username"));
        assert!(errors.contains("password1"));
        assert!(errors.contains("email"));
    }

    #[test]
    fn valid_signup_has_no_errors() {
        let form = SignupForm::bind(&payload(&[
            ("username", "leo.tolstoy"),
            ("password1", "war-and-peace"),
            ("password2", "war-and-peace"),
            ("email", "leo@example.com"),
        ]));
        assert!(form.errors().is_empty());
        assert_eq!(form.email().as_deref(), Some("leo@example.com"));
    }

    #[test]
    fn rendered_form_omits_passwords() {
        let form = SignupForm::bind(&payload(&[
            ("username", "leo"),
            ("password1", "secret-value"),
            ("password2", "secret-value"),
        ]));
        let rendered = render(&form, &FormErrors::new()).to_string();
        assert!(rendered.contains("leo"));
        assert!(!rendered.contains("secret-value"));
    }

    #[test]
    fn next_must_be_local_path() {
        assert_eq!(safe_next("/create/"), Some("/create/"));
        assert_eq!(safe_next("https://evil.example.com/"), None);
        assert_eq!(safe_next("//evil.example.com/"), None);
        assert_eq!(safe_next(""), None);
    }
}
