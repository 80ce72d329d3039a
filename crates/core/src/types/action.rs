//! Audit trail actions.

use serde::{Deserialize, Serialize};

/// What happened to a favorite, as recorded in the audit log.
///
/// Stored as `TEXT` in the database using the same spelling as the JSON form
/// (see [`FavoriteAction::as_str`] and the `FromStr` impl).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FavoriteAction {
    /// A favorite row was created.
    Favorited,
    /// A favorite row was removed.
    Unfavorited,
}

impl FavoriteAction {
    /// Database/JSON spelling of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Favorited => "FAVORITED",
            Self::Unfavorited => "UNFAVORITED",
        }
    }
}

impl std::fmt::Display for FavoriteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FavoriteAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FAVORITED" => Ok(Self::Favorited),
            "UNFAVORITED" => Ok(Self::Unfavorited),
            _ => Err(format!("invalid favorite action: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_action_spelling_matches_serde() {
        for action in [FavoriteAction::Favorited, FavoriteAction::Unfavorited] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
            assert_eq!(action.as_str().parse::<FavoriteAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!("LIKED".parse::<FavoriteAction>().is_err());
    }
}
