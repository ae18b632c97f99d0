use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// Author block embedded in posts and notifications.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserSummary {
    pub id: UserId,
    pub handle: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserSummary {
    /// Name shown in the feed header, falling back to the handle.
    pub fn display_name(&self) -> String {
        if let Some(full) = self.full_name.as_deref().filter(|s| !s.trim().is_empty()) {
            return full.to_string();
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            self.handle.clone()
        } else {
            joined
        }
    }

    pub fn initials(&self) -> String {
        let first = self.first_name.as_deref().and_then(|s| s.chars().next());
        let last = self.last_name.as_deref().and_then(|s| s.chars().next());
        match (first, last) {
            (None, None) => self
                .handle
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect())
                .unwrap_or_default(),
            (f, l) => f.into_iter().chain(l).flat_map(char::to_uppercase).collect(),
        }
    }
}

/// The authenticated viewer's profile as returned by `/auth/me`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct User {
    pub id: UserId,
    pub handle: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub posts_count: u64,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            handle: self.handle.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name.clone(),
        }
    }

    /// Preferred locale code, ignoring blank values.
    pub fn preferred_locale(&self) -> Option<&str> {
        self.preferred_language
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
