use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One turn of a conversation sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Merge adjacent turns of the same role.
///
/// The API expects roles to alternate, while replayed histories may hold
/// several user turns in a row.
pub fn coalesce(turns: &[Turn]) -> Vec<Turn> {
    let mut merged: Vec<Turn> = Vec::with_capacity(turns.len());
    for turn in turns {
        match merged.last_mut() {
            Some(last) if last.role == turn.role => {
                last.text.push_str("\n\n");
                last.text.push_str(&turn.text);
            }
            _ => merged.push(turn.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesce_merges_runs() {
        let turns = vec![
            Turn::user("a"),
            Turn::user("b"),
            Turn::model("c"),
            Turn::user("d"),
        ];
        let merged = coalesce(&turns);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].text, "a\n\nb");
        assert_eq!(merged[1].role, Role::Model);
    }

    #[test]
    fn test_coalesce_empty() {
        assert!(coalesce(&[]).is_empty());
    }
}
