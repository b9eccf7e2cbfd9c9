use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::object_id::ObjectId;

/// Category label classifying an event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum EventTag {
    Academic,
    Cultural,
    Sports,
    Technical,
    Workshop,
    #[serde(rename = "Industrial Visit")]
    IndustrialVisit,
    Other,
}

impl EventTag {
    pub const ALL: [EventTag; 7] = [
        EventTag::Academic,
        EventTag::Cultural,
        EventTag::Sports,
        EventTag::Technical,
        EventTag::Workshop,
        EventTag::IndustrialVisit,
        EventTag::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTag::Academic => "Academic",
            EventTag::Cultural => "Cultural",
            EventTag::Sports => "Sports",
            EventTag::Technical => "Technical",
            EventTag::Workshop => "Workshop",
            EventTag::IndustrialVisit => "Industrial Visit",
            EventTag::Other => "Other",
        }
    }

    /// Exact, case-sensitive match against the stored label.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == value)
    }
}

impl std::fmt::Display for EventTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct EventImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "https://cdn.example.edu/events/fest.jpg")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Copy of the posting user taken at write time, not a live reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostedBy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl Like {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            user_name: Some(user_name.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored event document.
///
/// `like_count` and `comment_count` are derived from the sequences on every
/// call and are not part of the serialized layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    #[schema(value_type = String, example = "65a1f0c2e4b0a1b2c3d4e5f6")]
    pub id: ObjectId,
    pub title: String,
    pub date: DateTime<Utc>,
    pub caption: String,
    pub tags: Vec<EventTag>,
    pub images: Vec<EventImage>,
    #[schema(value_type = String)]
    pub class_id: ObjectId,
    #[schema(value_type = String)]
    pub semester_id: ObjectId,
    pub posted_by: PostedBy,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn has_tag(&self, tag: EventTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Editable copy of the document, for a full re-validated write.
    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            title: Some(self.title.clone()),
            date: Some(self.date),
            caption: Some(self.caption.clone()),
            tags: self.tags.iter().map(|t| t.as_str().to_string()).collect(),
            images: self
                .images
                .iter()
                .map(|img| ImageDraft {
                    url: img.url.clone(),
                    caption: img.caption.clone(),
                })
                .collect(),
            class_id: Some(self.class_id),
            semester_id: Some(self.semester_id),
            posted_by: self.posted_by.clone(),
            likes: self.likes.clone(),
            comments: self
                .comments
                .iter()
                .map(|c| CommentDraft {
                    content: Some(c.content.clone()),
                    user_id: Some(c.user_id.clone()),
                    user_name: Some(c.user_name.clone()),
                    user_photo_url: c.user_photo_url.clone(),
                    created_at: Some(c.created_at),
                })
                .collect(),
        }
    }
}

/// Unvalidated candidate for an event write. Every field may be absent;
/// [`crate::validation::validate_event`] decides what is acceptable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDraft {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub caption: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<ImageDraft>,
    pub class_id: Option<ObjectId>,
    pub semester_id: Option<ObjectId>,
    pub posted_by: PostedBy,
    pub likes: Vec<Like>,
    pub comments: Vec<CommentDraft>,
}

impl EventDraft {
    pub fn new(
        title: impl Into<String>,
        date: DateTime<Utc>,
        caption: impl Into<String>,
        class_id: ObjectId,
        semester_id: ObjectId,
    ) -> Self {
        Self {
            title: Some(title.into()),
            date: Some(date),
            caption: Some(caption.into()),
            class_id: Some(class_id),
            semester_id: Some(semester_id),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image(mut self, image: ImageDraft) -> Self {
        self.images.push(image);
        self
    }

    pub fn posted_by(mut self, posted_by: PostedBy) -> Self {
        self.posted_by = posted_by;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageDraft {
    pub url: Option<String>,
    pub caption: Option<String>,
}

impl ImageDraft {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentDraft {
    pub content: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_photo_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CommentDraft {
    pub fn new(
        content: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            content: Some(content.into()),
            user_id: Some(user_id.into()),
            user_name: Some(user_name.into()),
            ..Default::default()
        }
    }
}
