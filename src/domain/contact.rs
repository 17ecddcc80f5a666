//! Contact-form messages and their field rules.

use serde::{Deserialize, Serialize};

pub const NAME_MAX_CHARS: usize = 30;
pub const MESSAGE_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Per-field validation messages; `None` means the field is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactErrors {
    pub name: Option<&'static str>,
    pub email: Option<&'static str>,
    pub message: Option<&'static str>,
}

impl ContactErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.message.is_none()
    }
}

impl ContactMessage {
    pub fn validate(&self) -> ContactErrors {
        ContactErrors {
            name: validate_name(&self.name),
            email: validate_email(&self.email),
            message: validate_message(&self.message),
        }
    }
}

fn validate_name(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("お名前は必須です。")
    } else if name.chars().count() > NAME_MAX_CHARS {
        Some("お名前は30文字以内で入力してください。")
    } else {
        None
    }
}

fn validate_email(email: &str) -> Option<&'static str> {
    if email.is_empty() {
        return Some("メールアドレスは必須です。");
    }
    if !looks_like_email(email) {
        return Some("メールアドレスの形式が正しくありません。");
    }
    None
}

fn validate_message(message: &str) -> Option<&'static str> {
    if message.trim().is_empty() {
        Some("本文は必須です。")
    } else if message.chars().count() > MESSAGE_MAX_CHARS {
        Some("本文は500文字以内で入力してください。")
    } else {
        None
    }
}

// local@domain.tld, no whitespace, exactly one `@`, a dot with text on both sides in the domain.
fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
