//! Coarse question categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag attached to each stored exchange. Not used for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Project,
    Product,
    Blog,
    User,
    General,
}

/// Keyword categories in match priority order.
const KEYWORDS: [Category; 4] = [
    Category::Project,
    Category::Product,
    Category::Blog,
    Category::User,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Product => "product",
            Self::Blog => "blog",
            Self::User => "user",
            Self::General => "general",
        }
    }

    /// Classify a question by keyword.
    ///
    /// The lower-cased text is searched for each keyword (or its plural) as a
    /// plain substring, in `KEYWORDS` order; the first hit wins.
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        KEYWORDS
            .into_iter()
            .find(|category| {
                let word = category.as_str();
                text.contains(word) || text.contains(&format!("{word}s"))
            })
            .unwrap_or(Self::General)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "product" => Ok(Self::Product),
            "blog" => Ok(Self::Blog),
            "user" => Ok(Self::User),
            "general" => Ok(Self::General),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}
