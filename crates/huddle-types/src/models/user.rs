use serde::{Deserialize, Serialize};

use super::id;

/// The signed-in user, as handed over by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Cached projection of a row in `users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    /// Name to render; derived from the email local-part when the stored name is unusable
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() && !name.contains('@') => name.to_string(),
            _ => derive_display_name(self.email.as_deref().unwrap_or_default()),
        }
    }

    pub fn initials(&self) -> String {
        initials(&self.display_name())
    }
}

/// `john.doe42@example.com` -> `John Doe`
pub fn derive_display_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect();

    let words: Vec<String> = cleaned
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        "User".to_string()
    } else {
        words.join(" ")
    }
}

/// Up to two upper-cased initials, `U` for an empty name
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect();
    if letters.is_empty() {
        "U".to_string()
    } else {
        letters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_display_name() {
        assert_eq!(derive_display_name("john.doe@example.com"), "John Doe");
        assert_eq!(derive_display_name("MARY_ann-smith99@x.io"), "Mary Ann Smith");
        assert_eq!(derive_display_name("1234@x.io"), "User");
        assert_eq!(derive_display_name(""), "User");
    }

    #[test]
    fn test_display_name_prefers_real_name() {
        let user = User {
            id: "u1".into(),
            name: Some("Jane Smith".into()),
            email: Some("jane@example.com".into()),
            role: None,
        };
        assert_eq!(user.display_name(), "Jane Smith");

        let email_as_name = User {
            name: Some("jane@example.com".into()),
            ..user
        };
        assert_eq!(email_as_name.display_name(), "Jane");
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Jane Smith"), "JS");
        assert_eq!(initials("ada lovelace byron"), "AL");
        assert_eq!(initials("  "), "U");
    }
}
