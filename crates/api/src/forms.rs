//! HTML form payloads and their rendered state.
//!
//! Forms arrive urlencoded. A form that fails validation is sent back with
//! the submitted values and per-field messages instead of being saved.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::ValidationErrors;
use yatube_core::{CommentInput, PostInput};
use yatube_db::entities::post;

use crate::response::GroupView;

/// Messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Message for a group id that does not name an existing group.
pub const INVALID_GROUP_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Submitted or initial form values with any validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub fields: BTreeMap<String, String>,
    pub errors: FieldErrors,
}

impl FormView {
    /// The empty comment form shown under a post.
    #[must_use]
    pub fn comment() -> Self {
        Self {
            fields: BTreeMap::from([("text".to_string(), String::new())]),
            errors: FieldErrors::new(),
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Context of the create and edit pages.
#[derive(Debug, Clone, Serialize)]
pub struct PostFormPage {
    pub form: FormView,
    pub is_edit: bool,
    /// Groups a post can be filed under.
    pub groups: Vec<GroupView>,
}

/// Body of `POST /create/` and `POST /posts/{id}/edit/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    /// Group ID; blank means no group.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl PostForm {
    /// Prefill from a stored post.
    #[must_use]
    pub fn from_post(post: &post::Model) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.clone(),
            image: post.image.clone(),
        }
    }

    #[must_use]
    pub fn view(&self) -> FormView {
        FormView {
            fields: BTreeMap::from([
                ("text".to_string(), self.text.clone()),
                ("group".to_string(), self.group.clone().unwrap_or_default()),
                ("image".to_string(), self.image.clone().unwrap_or_default()),
            ]),
            errors: FieldErrors::new(),
        }
    }

    #[must_use]
    pub fn into_input(self) -> PostInput {
        PostInput {
            text: self.text,
            group: non_blank(self.group),
            image: non_blank(self.image),
        }
    }
}

/// Body of `POST /posts/{id}/comment/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    #[must_use]
    pub fn into_input(self) -> CommentInput {
        CommentInput { text: self.text }
    }
}

/// Flatten validator output into messages per field.
#[must_use]
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| e.code.to_string(), ToString::to_string)
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// A single-field error map.
#[must_use]
pub fn single_error(field: &str, message: &str) -> FieldErrors {
    FieldErrors::from([(field.to_string(), vec![message.to_string()])])
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
