use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static HANDLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    // 用户句柄只允许字母、数字、下划线和连字符
    Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap()
});

/// 验证用户句柄格式
pub fn validate_handle(handle: &str) -> Result<()> {
    if handle.trim().is_empty() {
        return Err(AppError::validation("Handle cannot be empty"));
    }

    if handle.len() < 3 {
        return Err(AppError::validation("Handle must be at least 3 characters"));
    }

    if handle.len() > 30 {
        return Err(AppError::validation("Handle cannot exceed 30 characters"));
    }

    if !HANDLE_REGEX.is_match(handle) {
        return Err(AppError::validation(
            "Handle may only contain letters, numbers, underscores and hyphens",
        ));
    }

    Ok(())
}

/// 验证邮箱格式
pub fn validate_email_format(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(AppError::validation("Email cannot be empty"));
    }

    if !validator::validate_email(email) {
        return Err(AppError::validation("Invalid email format"));
    }

    if email.len() > 254 {
        return Err(AppError::validation("Email address is too long"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_handle() {
        assert!(validate_handle("alice").is_ok());
        assert!(validate_handle("dev_42").is_ok());
        assert!(validate_handle("a-b-c").is_ok());

        assert!(validate_handle("").is_err());
        assert!(validate_handle("ab").is_err());
        assert!(validate_handle(&"x".repeat(31)).is_err());
        assert!(validate_handle("has space").is_err());
        assert!(validate_handle("héllo").is_err());
    }

    #[test]
    fn test_validate_email_format() {
        assert!(validate_email_format("user@example.com").is_ok());
        assert!(validate_email_format("test.email+tag@domain.co.uk").is_ok());

        assert!(validate_email_format("").is_err());
        assert!(validate_email_format("not-an-email").is_err());
        assert!(validate_email_format("@missing-local.com").is_err());
    }
}
