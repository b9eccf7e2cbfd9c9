use utoipa::{Modify, OpenApi};

use crate::models::{Comment, Event, EventImage, EventTag, Like, PostedBy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_i8(&self) -> i8 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

/// A compound secondary index over the events collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: &'static [(&'static str, Direction)],
}

impl IndexSpec {
    /// Mongo-style key document, e.g. `{ classId: 1, date: -1 }`.
    pub fn describe(&self) -> String {
        let keys: Vec<String> = self
            .keys
            .iter()
            .map(|(field, dir)| format!("{field}: {}", dir.as_i8()))
            .collect();
        format!("{{ {} }}", keys.join(", "))
    }
}

pub const INDEXES: [IndexSpec; 3] = [
    IndexSpec {
        keys: &[("classId", Direction::Ascending), ("date", Direction::Descending)],
    },
    IndexSpec {
        keys: &[
            ("classId", Direction::Ascending),
            ("semesterId", Direction::Ascending),
        ],
    },
    IndexSpec {
        keys: &[("tags", Direction::Ascending)],
    },
];

pub struct IndexAddon;

impl Modify for IndexAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let indexes: Vec<String> = INDEXES.iter().map(IndexSpec::describe).collect();
        openapi.info.description = Some(format!(
            "Event documents. Indexes: {}. likeCount and commentCount are derived on read.",
            indexes.join("; ")
        ));
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "class-events", description = "Event documents"),
    components(schemas(Event, Comment, EventImage, EventTag, Like, PostedBy)),
    modifiers(&IndexAddon),
)]
pub struct SchemaDoc;

/// Pretty-printed JSON export of the document layout.
pub fn export_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&SchemaDoc::openapi())
}
