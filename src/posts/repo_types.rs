use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Property,
    Roommate,
}

impl FromStr for PostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "property" => Ok(PostKind::Property),
            "roommate" => Ok(PostKind::Roommate),
            other => Err(format!("unknown post kind `{}`", other)),
        }
    }
}

/// Listing entry in `posts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    pub user_email: String, // owner
    pub user_name: String,
    pub kind: PostKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>, // emails
    #[serde(default)]
    pub views: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_email: String,
    pub user_name: String,
    pub kind: PostKind,
    pub title: String,
    pub description: String,
    pub price: Option<u64>,
    pub location: Option<String>,
    pub university: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostPatch {
    pub kind: Option<PostKind>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub location: Option<String>,
    pub university: Option<String>,
    pub images: Option<Vec<String>>,
}

impl PostPatch {
    pub fn apply(self, post: &mut PostRecord) {
        if let Some(v) = self.kind {
            post.kind = v;
        }
        if let Some(v) = self.title {
            post.title = v;
        }
        if let Some(v) = self.description {
            post.description = v;
        }
        if let Some(v) = self.price {
            post.price = Some(v);
        }
        if let Some(v) = self.location {
            post.location = Some(v);
        }
        if let Some(v) = self.university {
            post.university = Some(v);
        }
        if let Some(v) = self.images {
            post.images = v;
        }
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

/// Query value parsed with `FromStr`; a blank value is `None`.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Listing query. Empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub kind: Option<PostKind>,
    pub location: Option<String>,
    pub university: Option<String>,
    pub owner: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<u64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<u64>,
    pub q: Option<String>,
}

impl PostFilter {
    pub fn matches(&self, post: &PostRecord) -> bool {
        let text = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if self.kind.is_some_and(|k| k != post.kind) {
            return false;
        }
        if let Some(loc) = text(&self.location) {
            if !contains_ci(post.location.as_deref(), &loc) {
                return false;
            }
        }
        if let Some(uni) = text(&self.university) {
            if !contains_ci(post.university.as_deref(), &uni) {
                return false;
            }
        }
        if let Some(owner) = text(&self.owner) {
            if !post.user_email.eq_ignore_ascii_case(&owner) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if post.price.map_or(true, |p| p < min) {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if post.price.map_or(true, |p| p > max) {
                return false;
            }
        }
        if let Some(q) = text(&self.q) {
            if !contains_ci(Some(&post.title), &q) && !contains_ci(Some(&post.description), &q) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> PostRecord {
        PostRecord {
            id: "p1".into(),
            user_email: "owner@test.com".into(),
            user_name: "Owner".into(),
            kind: PostKind::Property,
            title: "Sunny studio near campus".into(),
            description: "Furnished, wifi included".into(),
            price: Some(3500),
            location: Some("Nasr City, Cairo".into()),
            university: Some("Al-Azhar University".into()),
            images: vec![],
            likes: vec![],
            views: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(PostFilter::default().matches(&post()));
    }

    #[test]
    fn text_filters_are_case_insensitive_substrings() {
        let f = PostFilter {
            location: Some("cairo".into()),
            q: Some("WIFI".into()),
            ..Default::default()
        };
        assert!(f.matches(&post()));

        let f = PostFilter {
            university: Some("Helwan".into()),
            ..Default::default()
        };
        assert!(!f.matches(&post()));
    }

    #[test]
    fn price_bounds_exclude_unpriced_posts() {
        let f = PostFilter {
            min_price: Some(3000),
            max_price: Some(4000),
            ..Default::default()
        };
        assert!(f.matches(&post()));

        let mut unpriced = post();
        unpriced.price = None;
        assert!(!f.matches(&unpriced));

        let f = PostFilter {
            max_price: Some(3000),
            ..Default::default()
        };
        assert!(!f.matches(&post()));
    }

    #[test]
    fn kind_and_owner_filters() {
        let f = PostFilter {
            kind: Some(PostKind::Roommate),
            ..Default::default()
        };
        assert!(!f.matches(&post()));

        let f = PostFilter {
            owner: Some("OWNER@test.com".into()),
            ..Default::default()
        };
        assert!(f.matches(&post()));
    }

    #[test]
    fn patch_rejects_owner_fields() {
        assert!(serde_json::from_str::<PostPatch>(r#"{"userEmail":"x@y.z"}"#).is_err());
        let p: PostPatch = serde_json::from_str(r#"{"price":4000}"#).expect("parse");
        let mut rec = post();
        p.apply(&mut rec);
        assert_eq!(rec.price, Some(4000));
        assert_eq!(rec.title, "Sunny studio near campus");
    }
}
