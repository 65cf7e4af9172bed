//! Secret lookup and masking

/// Get secret from environment variable or file
///
/// Supports both direct environment variables and file-based secrets (Docker/Kubernetes pattern).
/// If `VAR_NAME` is not set or blank, tries `VAR_NAME_FILE` which should point to a file containing the secret.
///
/// # Examples
///
/// ```no_run
/// use zbxutil_core::get_secret;
///
/// // File-based secret (Docker/K8s)
/// std::env::set_var("ZABBIX_PASSWORD_FILE", "/run/secrets/zabbix_password");
/// let password = get_secret("ZABBIX_PASSWORD");
/// assert!(password.is_some());
/// ```
pub fn get_secret(var_name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(var_name) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    let file_var = format!("{}_FILE", var_name);
    if let Ok(path) = std::env::var(&file_var) {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            let contents = contents.trim();
            if !contents.is_empty() {
                return Some(contents.to_string());
            }
        }
    }

    None
}

/// Mask sensitive tokens/keys for safe logging
///
/// Masks all but the first and last 3 characters of tokens longer than 8 characters.
/// Tokens 8 characters or shorter are completely masked.
///
/// # Examples
///
/// ```
/// use zbxutil_core::mask_token;
///
/// assert_eq!(mask_token("abc123def456ghi789"), "abc***789");
/// assert_eq!(mask_token("secret"), "***");
/// ```
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        "***".to_string()
    } else {
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 3..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token_long() {
        assert_eq!(mask_token("abc123def456ghi789"), "abc***789");
    }

    #[test]
    fn test_mask_token_exactly_8() {
        assert_eq!(mask_token("12345678"), "***");
    }

    #[test]
    fn test_mask_token_exactly_9() {
        assert_eq!(mask_token("123456789"), "123***789");
    }

    #[test]
    fn test_mask_token_empty() {
        assert_eq!(mask_token(""), "***");
    }

    #[test]
    fn test_mask_token_multibyte() {
        assert_eq!(mask_token("ééééééééé"), "ééé***ééé");
    }

    #[test]
    fn test_get_secret_prefers_env_then_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        std::fs::write(&path, "from-file\n").unwrap();

        // Unique names so parallel tests do not collide
        std::env::set_var("ZBXUTIL_TEST_SECRET_A_FILE", &path);
        assert_eq!(
            get_secret("ZBXUTIL_TEST_SECRET_A").as_deref(),
            Some("from-file")
        );

        std::env::set_var("ZBXUTIL_TEST_SECRET_A", "from-env");
        assert_eq!(
            get_secret("ZBXUTIL_TEST_SECRET_A").as_deref(),
            Some("from-env")
        );

        assert_eq!(get_secret("ZBXUTIL_TEST_SECRET_MISSING"), None);
    }
}
