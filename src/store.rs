//! In-process event collection with secondary indexes and optional JSON
//! snapshot persistence.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{CommentDraft, Event, EventDraft, EventTag, ImageDraft, Like};
use crate::object_id::ObjectId;
use crate::validation::{
    check_event, validate_comment, validate_event, validate_image, validate_tag,
};

/// Sort key shared by every index: newest `date` first, ties broken by id.
type DateKey = (Reverse<DateTime<Utc>>, ObjectId);

fn date_key(event: &Event) -> DateKey {
    (Reverse(event.date), event.id)
}

/// Writes `bytes` to a temp file next to `path`, syncs it and renames it over `path`.
fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent_dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent_dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

fn remove_key<K: Ord>(index: &mut BTreeMap<K, BTreeSet<DateKey>>, key: K, entry: &DateKey) {
    if let Some(set) = index.get_mut(&key) {
        set.remove(entry);
        if set.is_empty() {
            index.remove(&key);
        }
    }
}

#[derive(Default)]
struct Collection {
    docs: HashMap<ObjectId, Event>,
    // (classId 1, date -1)
    by_class_date: BTreeMap<ObjectId, BTreeSet<DateKey>>,
    // (classId 1, semesterId 1)
    by_class_semester: BTreeMap<(ObjectId, ObjectId), BTreeSet<DateKey>>,
    // (tags 1)
    by_tag: BTreeMap<EventTag, BTreeSet<DateKey>>,
}

impl Collection {
    fn index(&mut self, event: &Event) {
        let key = date_key(event);
        self.by_class_date
            .entry(event.class_id)
            .or_default()
            .insert(key);
        self.by_class_semester
            .entry((event.class_id, event.semester_id))
            .or_default()
            .insert(key);
        for tag in &event.tags {
            self.by_tag.entry(*tag).or_default().insert(key);
        }
    }

    fn unindex(&mut self, event: &Event) {
        let key = date_key(event);
        remove_key(&mut self.by_class_date, event.class_id, &key);
        remove_key(
            &mut self.by_class_semester,
            (event.class_id, event.semester_id),
            &key,
        );
        for tag in &event.tags {
            remove_key(&mut self.by_tag, *tag, &key);
        }
    }

    /// Stores `event`, returning the document it replaced.
    fn put(&mut self, event: Event) -> Option<Event> {
        let previous = self.docs.remove(&event.id);
        if let Some(old) = &previous {
            self.unindex(old);
        }
        self.index(&event);
        self.docs.insert(event.id, event);
        previous
    }

    fn remove(&mut self, id: &ObjectId) -> Option<Event> {
        let event = self.docs.remove(id)?;
        self.unindex(&event);
        Some(event)
    }

    fn restore(&mut self, id: ObjectId, previous: Option<Event>) {
        match previous {
            Some(event) => {
                self.put(event);
            }
            None => {
                self.remove(&id);
            }
        }
    }

    fn resolve(&self, keys: Option<&BTreeSet<DateKey>>) -> Vec<Event> {
        keys.into_iter()
            .flatten()
            .filter_map(|(_, id)| self.docs.get(id).cloned())
            .collect()
    }

    fn snapshot(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.docs.values().collect();
        events.sort_by_key(|e| e.id);
        events
    }
}

/// Shared handle to the event collection. Clones point at the same data.
///
/// Each write holds the collection lock from validation until the snapshot
/// (if any) is on disk, so single-document writes are atomic and a rejected
/// or failed write leaves the stored document untouched.
#[derive(Clone, Default)]
pub struct EventStore {
    inner: Arc<RwLock<Collection>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl EventStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a store backed by the JSON snapshot at `path`. A missing file
    /// yields an empty store; the file is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut collection = Collection::default();

        if path.exists() {
            let data = fs::read_to_string(&path)?;
            let events: Vec<Event> = serde_json::from_str(&data)?;
            for event in events {
                if let Err(source) = check_event(&event) {
                    warn!(id = %event.id, error = %source, "invalid document in snapshot");
                    return Err(StoreError::InvalidDocument {
                        id: event.id,
                        source,
                    });
                }
                collection.put(event);
            }
        }
        info!(
            path = %path.display(),
            events = collection.docs.len(),
            "opened event store"
        );

        Ok(Self {
            inner: Arc::new(RwLock::new(collection)),
            snapshot_path: Some(Arc::new(path)),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref().map(PathBuf::as_path)
    }

    /// Serializes under the caller's lock; file I/O runs on the blocking pool.
    async fn persist(&self, collection: &Collection) -> Result<(), StoreError> {
        let Some(path) = self.snapshot_path.clone() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&collection.snapshot())?;
        tokio::task::spawn_blocking(move || write_snapshot(&path, &bytes)).await?
    }

    /// Puts `event` and writes the snapshot, undoing the put if the write fails.
    async fn commit(&self, collection: &mut Collection, event: Event) -> Result<(), StoreError> {
        let id = event.id;
        let previous = collection.put(event);
        if let Err(err) = self.persist(collection).await {
            warn!(%id, error = %err, "snapshot write failed, change rolled back");
            collection.restore(id, previous);
            return Err(err);
        }
        Ok(())
    }

    /// Validates `draft` and stores it under a fresh id with
    /// `createdAt == updatedAt == now`.
    pub async fn insert(&self, draft: EventDraft) -> Result<Event, StoreError> {
        let mut collection = self.inner.write().await;
        let event = validate_event(draft, ObjectId::new(), Utc::now()).inspect_err(|err| {
            warn!(error = %err, "rejected event insert");
        })?;

        self.commit(&mut collection, event.clone()).await?;
        info!(id = %event.id, class_id = %event.class_id, "stored event");
        Ok(event)
    }

    /// Full re-validated write of an existing document. `_id` and
    /// `createdAt` are kept, `updatedAt` is refreshed.
    pub async fn replace(&self, id: ObjectId, draft: EventDraft) -> Result<Event, StoreError> {
        let mut collection = self.inner.write().await;
        let created_at = collection
            .docs
            .get(&id)
            .map(|e| e.created_at)
            .ok_or(StoreError::NotFound(id))?;

        let mut event = validate_event(draft, id, Utc::now()).inspect_err(|err| {
            warn!(%id, error = %err, "rejected event replace");
        })?;
        event.created_at = created_at;

        self.commit(&mut collection, event.clone()).await?;
        debug!(%id, "replaced event");
        Ok(event)
    }

    pub async fn get(&self, id: ObjectId) -> Option<Event> {
        self.inner.read().await.docs.get(&id).cloned()
    }

    /// Removes the document. Returns `false` when no such id exists.
    pub async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut collection = self.inner.write().await;
        let Some(event) = collection.remove(&id) else {
            return Ok(false);
        };
        if let Err(err) = self.persist(&collection).await {
            warn!(%id, error = %err, "snapshot write failed, delete rolled back");
            collection.put(event);
            return Err(err);
        }
        info!(%id, "deleted event");
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.docs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Events of a class, newest `date` first.
    pub async fn find_by_class(&self, class_id: ObjectId) -> Vec<Event> {
        let collection = self.inner.read().await;
        collection.resolve(collection.by_class_date.get(&class_id))
    }

    /// Events of a class within one semester, newest `date` first.
    pub async fn find_by_class_and_semester(
        &self,
        class_id: ObjectId,
        semester_id: ObjectId,
    ) -> Vec<Event> {
        let collection = self.inner.read().await;
        collection.resolve(collection.by_class_semester.get(&(class_id, semester_id)))
    }

    /// Events carrying `tag`, newest `date` first.
    pub async fn find_by_tag(&self, tag: EventTag) -> Vec<Event> {
        let collection = self.inner.read().await;
        collection.resolve(collection.by_tag.get(&tag))
    }

    /// Applies `change` to a copy of the document and commits it when the
    /// closure reports a modification.
    async fn modify<F>(&self, id: ObjectId, op: &'static str, change: F) -> Result<Event, StoreError>
    where
        F: FnOnce(&mut Event, DateTime<Utc>) -> Result<bool, StoreError>,
    {
        let mut collection = self.inner.write().await;
        let mut event = collection
            .docs
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;

        let now = Utc::now();
        let changed = change(&mut event, now).inspect_err(|err| {
            warn!(%id, op, error = %err, "rejected event update");
        })?;
        if !changed {
            return Ok(event);
        }

        event.updated_at = now;
        self.commit(&mut collection, event.clone()).await?;
        debug!(
            %id,
            op,
            likes = event.like_count(),
            comments = event.comment_count(),
            "updated event"
        );
        Ok(event)
    }

    /// Appends a like. The same user may like an event more than once.
    pub async fn add_like(&self, id: ObjectId, like: Like) -> Result<Event, StoreError> {
        self.modify(id, "add_like", |event, _| {
            event.likes.push(like);
            Ok(true)
        })
        .await
    }

    /// Removes the first like recorded for `user_id`, if any.
    pub async fn remove_like(&self, id: ObjectId, user_id: &str) -> Result<Event, StoreError> {
        self.modify(id, "remove_like", |event, _| {
            let position = event
                .likes
                .iter()
                .position(|like| like.user_id.as_deref() == Some(user_id));
            Ok(position.map(|i| event.likes.remove(i)).is_some())
        })
        .await
    }

    /// Appends a comment, stamped with the write time unless it carries one.
    pub async fn add_comment(&self, id: ObjectId, draft: CommentDraft) -> Result<Event, StoreError> {
        self.modify(id, "add_comment", |event, now| {
            let comment = validate_comment(draft, event.comments.len(), now)?;
            event.comments.push(comment);
            Ok(true)
        })
        .await
    }

    pub async fn remove_comment(&self, id: ObjectId, index: usize) -> Result<Event, StoreError> {
        self.modify(id, "remove_comment", |event, _| {
            let len = event.comments.len();
            if index >= len {
                return Err(StoreError::IndexOutOfRange {
                    field: "comments",
                    index,
                    len,
                });
            }
            event.comments.remove(index);
            Ok(true)
        })
        .await
    }

    pub async fn add_image(&self, id: ObjectId, draft: ImageDraft) -> Result<Event, StoreError> {
        self.modify(id, "add_image", |event, _| {
            let image = validate_image(draft, event.images.len())?;
            event.images.push(image);
            Ok(true)
        })
        .await
    }

    pub async fn remove_image(&self, id: ObjectId, index: usize) -> Result<Event, StoreError> {
        self.modify(id, "remove_image", |event, _| {
            let len = event.images.len();
            if index >= len {
                return Err(StoreError::IndexOutOfRange {
                    field: "images",
                    index,
                    len,
                });
            }
            event.images.remove(index);
            Ok(true)
        })
        .await
    }

    /// Appends a tag given by its label; labels outside the enumeration are rejected.
    pub async fn add_tag(&self, id: ObjectId, label: &str) -> Result<Event, StoreError> {
        self.modify(id, "add_tag", |event, _| {
            let tag = validate_tag(label, event.tags.len())?;
            event.tags.push(tag);
            Ok(true)
        })
        .await
    }

    /// Removes every occurrence of `tag`.
    pub async fn remove_tag(&self, id: ObjectId, tag: EventTag) -> Result<Event, StoreError> {
        self.modify(id, "remove_tag", |event, _| {
            let before = event.tags.len();
            event.tags.retain(|t| *t != tag);
            Ok(event.tags.len() != before)
        })
        .await
    }
}
