use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::{Comment, CommentDraft, Event, EventDraft, EventImage, EventTag, ImageDraft};
use crate::object_id::ObjectId;

static IMAGE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://.+\.(jpg|jpeg|png|gif)$").expect("regex compiles"));

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Path `{path}` is required.")]
    Required { path: String },
    #[error("`{value}` is not a valid enum value for path `{path}`.")]
    InvalidTag { path: String, value: String },
    #[error("{value} is not a valid image URL")]
    InvalidImageUrl { path: String, value: String },
    #[error("Path `{path}` has leading or trailing whitespace.")]
    Untrimmed { path: String },
}

impl FieldError {
    pub fn path(&self) -> &str {
        match self {
            FieldError::Required { path }
            | FieldError::InvalidTag { path, .. }
            | FieldError::InvalidImageUrl { path, .. }
            | FieldError::Untrimmed { path } => path,
        }
    }
}

/// Every field failure found in one write attempt, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn field(&self, path: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.path() == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Event validation failed: ")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", err.path(), err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

pub fn is_valid_image_url(url: &str) -> bool {
    IMAGE_URL.is_match(url)
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn required<T>(&mut self, path: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.errors.push(FieldError::Required {
                path: path.to_string(),
            });
        }
        value
    }

    /// Empty strings count as missing, after trimming when `trim` is set.
    fn required_text(&mut self, path: &str, value: Option<String>, trim: bool) -> Option<String> {
        let value = value
            .map(|v| if trim { v.trim().to_string() } else { v })
            .filter(|v| !v.is_empty());
        self.required(path, value)
    }

    fn tag(&mut self, path: String, value: &str) -> Option<EventTag> {
        let tag = EventTag::parse(value);
        if tag.is_none() {
            self.errors.push(FieldError::InvalidTag {
                path,
                value: value.to_string(),
            });
        }
        tag
    }

    fn image_url(&mut self, index: usize, url: &str) -> bool {
        let valid = is_valid_image_url(url);
        if !valid {
            self.errors.push(FieldError::InvalidImageUrl {
                path: format!("images.{index}.url"),
                value: url.to_string(),
            });
        }
        valid
    }

    /// Checks text that should already be in its stored form.
    fn stored_text(&mut self, path: String, value: &str, trimmed: bool) {
        if value.is_empty() {
            self.errors.push(FieldError::Required { path });
        } else if trimmed && value.trim() != value {
            self.errors.push(FieldError::Untrimmed { path });
        }
    }

    /// The url pattern applies only to a url that is present.
    fn image(&mut self, index: usize, draft: ImageDraft) -> Option<EventImage> {
        if let Some(url) = draft.url.as_deref()
            && !self.image_url(index, url)
        {
            return None;
        }
        Some(EventImage {
            url: draft.url,
            caption: draft.caption,
        })
    }

    fn comment(&mut self, index: usize, draft: CommentDraft, now: DateTime<Utc>) -> Option<Comment> {
        let content = self.required_text(&format!("comments.{index}.content"), draft.content, true);
        let user_id = self.required_text(&format!("comments.{index}.userId"), draft.user_id, false);
        let user_name =
            self.required_text(&format!("comments.{index}.userName"), draft.user_name, false);
        Some(Comment {
            content: content?,
            user_id: user_id?,
            user_name: user_name?,
            user_photo_url: draft.user_photo_url,
            created_at: draft.created_at.unwrap_or(now),
        })
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(ValidationError {
                errors: self.errors,
            }),
        }
    }
}

/// Turns a draft into a storable event with `created_at == updated_at == now`.
///
/// Strings flagged as trimmed (`title`, `caption`, comment `content`) are
/// stripped first, comments without a timestamp receive `now`.
pub fn validate_event(
    draft: EventDraft,
    id: ObjectId,
    now: DateTime<Utc>,
) -> Result<Event, ValidationError> {
    let mut checker = Checker::default();

    let title = checker.required_text("title", draft.title, true);
    let date = checker.required("date", draft.date);
    let caption = checker.required_text("caption", draft.caption, true);

    let tags: Vec<Option<EventTag>> = draft
        .tags
        .iter()
        .enumerate()
        .map(|(i, value)| checker.tag(format!("tags.{i}"), value))
        .collect();
    let images: Vec<Option<EventImage>> = draft
        .images
        .into_iter()
        .enumerate()
        .map(|(i, image)| checker.image(i, image))
        .collect();

    let class_id = checker.required("classId", draft.class_id);
    let semester_id = checker.required("semesterId", draft.semester_id);

    let comments: Vec<Option<Comment>> = draft
        .comments
        .into_iter()
        .enumerate()
        .map(|(i, comment)| checker.comment(i, comment, now))
        .collect();

    let event = (|| {
        Some(Event {
            id,
            title: title?,
            date: date?,
            caption: caption?,
            tags: tags.into_iter().collect::<Option<Vec<_>>>()?,
            images: images.into_iter().collect::<Option<Vec<_>>>()?,
            class_id: class_id?,
            semester_id: semester_id?,
            posted_by: draft.posted_by,
            likes: draft.likes,
            comments: comments.into_iter().collect::<Option<Vec<_>>>()?,
            created_at: now,
            updated_at: now,
        })
    })();
    checker.finish(event)
}

/// Re-checks a document that was already stored, such as one read back
/// from a snapshot file. Nothing is normalized: blank or untrimmed text and
/// non-matching image urls are reported.
pub fn check_event(event: &Event) -> Result<(), ValidationError> {
    let mut checker = Checker::default();
    checker.stored_text("title".to_string(), &event.title, true);
    checker.stored_text("caption".to_string(), &event.caption, true);
    for (i, image) in event.images.iter().enumerate() {
        if let Some(url) = image.url.as_deref() {
            checker.image_url(i, url);
        }
    }
    for (i, comment) in event.comments.iter().enumerate() {
        checker.stored_text(format!("comments.{i}.content"), &comment.content, true);
        checker.stored_text(format!("comments.{i}.userId"), &comment.user_id, false);
        checker.stored_text(format!("comments.{i}.userName"), &comment.user_name, false);
    }
    checker.finish(Some(()))
}

/// Validates one comment destined for position `index` of an event.
pub fn validate_comment(
    draft: CommentDraft,
    index: usize,
    now: DateTime<Utc>,
) -> Result<Comment, ValidationError> {
    let mut checker = Checker::default();
    let comment = checker.comment(index, draft, now);
    checker.finish(comment)
}

/// Validates one image destined for position `index` of an event.
pub fn validate_image(draft: ImageDraft, index: usize) -> Result<EventImage, ValidationError> {
    let mut checker = Checker::default();
    let image = checker.image(index, draft);
    checker.finish(image)
}

/// Validates one tag destined for position `index` of an event.
pub fn validate_tag(value: &str, index: usize) -> Result<EventTag, ValidationError> {
    let mut checker = Checker::default();
    let tag = checker.tag(format!("tags.{index}"), value);
    checker.finish(tag)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 9, 30, 0).unwrap()
    }

    fn draft() -> EventDraft {
        EventDraft::new(
            "  Sports Day ",
            Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap(),
            "Track and field\n",
            ObjectId::new(),
            ObjectId::new(),
        )
    }

    #[test]
    fn test_image_url_pattern() {
        assert!(is_valid_image_url("https://a.com/b.jpg"));
        assert!(is_valid_image_url("http://x.io/pic.jpeg"));
        assert!(is_valid_image_url("http://x.io/a/b.gif"));
        assert!(!is_valid_image_url("ftp://x.png"));
        assert!(!is_valid_image_url("http://x.bmp"));
        assert!(!is_valid_image_url("https://a.com/b.JPG"));
        assert!(!is_valid_image_url("https://.png"));
        assert!(!is_valid_image_url("https://a.com/b.png?size=2"));
    }

    #[test]
    fn test_trims_required_text() {
        let event = validate_event(draft(), ObjectId::new(), now()).unwrap();
        assert_eq!(event.title, "Sports Day");
        assert_eq!(event.caption, "Track and field");
        assert_eq!(event.created_at, now());
        assert_eq!(event.updated_at, now());
    }

    #[test]
    fn test_missing_required_fields() {
        let err = validate_event(EventDraft::default(), ObjectId::new(), now()).unwrap_err();
        let paths: Vec<&str> = err.errors.iter().map(FieldError::path).collect();
        assert_eq!(paths, vec!["title", "date", "caption", "classId", "semesterId"]);
    }

    #[test]
    fn test_blank_title_is_missing() {
        let mut d = draft();
        d.title = Some("   ".to_string());
        let err = validate_event(d, ObjectId::new(), now()).unwrap_err();
        assert_eq!(
            err.errors,
            vec![FieldError::Required {
                path: "title".to_string()
            }]
        );
    }

    #[test]
    fn test_invalid_tag() {
        let d = draft().with_tags(["Academic", "Invalid"]);
        let err = validate_event(d, ObjectId::new(), now()).unwrap_err();
        assert_eq!(
            err.field("tags.1"),
            Some(&FieldError::InvalidTag {
                path: "tags.1".to_string(),
                value: "Invalid".to_string()
            })
        );
        assert!(err.field("tags.0").is_none());
    }

    #[test]
    fn test_invalid_image_message_echoes_value() {
        let d = draft()
            .with_image(ImageDraft::new("https://a.com/b.jpg"))
            .with_image(ImageDraft::new("http://x.bmp"));
        let err = validate_event(d, ObjectId::new(), now()).unwrap_err();
        let field = err.field("images.1.url").unwrap();
        assert_eq!(field.to_string(), "http://x.bmp is not a valid image URL");
        assert_eq!(
            err.to_string(),
            "Event validation failed: images.1.url: http://x.bmp is not a valid image URL"
        );
    }

    #[test]
    fn test_image_without_url_accepted() {
        let d = draft().with_image(ImageDraft {
            url: None,
            caption: Some("stage".to_string()),
        });
        let event = validate_event(d, ObjectId::new(), now()).unwrap();
        assert_eq!(event.images[0].url, None);
        assert_eq!(event.images[0].caption.as_deref(), Some("stage"));
    }

    #[test]
    fn test_check_stored_event() {
        let mut event = validate_event(
            draft().with_image(ImageDraft::new("https://a.com/b.png")),
            ObjectId::new(),
            now(),
        )
        .unwrap();
        assert!(check_event(&event).is_ok());

        event.title = String::new();
        event.caption = " padded".to_string();
        event.images[0].url = Some("http://x.bmp".to_string());
        let err = check_event(&event).unwrap_err();
        let paths: Vec<&str> = err.errors.iter().map(FieldError::path).collect();
        assert_eq!(paths, vec!["title", "caption", "images.0.url"]);
        assert!(matches!(err.field("caption"), Some(FieldError::Untrimmed { .. })));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut d = draft().with_tags(["Nope"]).with_image(ImageDraft::new("ftp://x.png"));
        d.caption = None;
        let err = validate_event(d, ObjectId::new(), now()).unwrap_err();
        assert_eq!(err.errors.len(), 3);
    }

    #[test]
    fn test_comment_defaults_and_requirements() {
        let comment = validate_comment(CommentDraft::new("  nice!  ", "u1", "Asha"), 0, now()).unwrap();
        assert_eq!(comment.content, "nice!");
        assert_eq!(comment.created_at, now());
        assert!(comment.user_photo_url.is_none());

        let err = validate_comment(CommentDraft::new(" ", "u1", ""), 4, now()).unwrap_err();
        let paths: Vec<&str> = err.errors.iter().map(FieldError::path).collect();
        assert_eq!(paths, vec!["comments.4.content", "comments.4.userName"]);
    }

    #[test]
    fn test_comment_keeps_explicit_timestamp() {
        let earlier = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        let mut d = CommentDraft::new("hi", "u1", "Asha");
        d.created_at = Some(earlier);
        assert_eq!(validate_comment(d, 0, now()).unwrap().created_at, earlier);
    }

    #[test]
    fn test_single_value_checks() {
        assert_eq!(validate_tag("Workshop", 0).unwrap(), EventTag::Workshop);
        assert!(validate_tag("Party", 2).unwrap_err().field("tags.2").is_some());
        assert!(validate_image(ImageDraft::new("https://a.com/b.png"), 0).is_ok());
        assert!(validate_image(ImageDraft::new("https://a.com/b.webp"), 0).is_err());
    }
}
