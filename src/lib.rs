pub mod error;
pub mod models;
pub mod object_id;
pub mod schema;
pub mod settings;
pub mod store;
pub mod validation;

use tracing::info;

pub use crate::error::StoreError;
pub use crate::models::{
    Comment, CommentDraft, Event, EventDraft, EventImage, EventTag, ImageDraft, Like, PostedBy,
};
pub use crate::object_id::ObjectId;
pub use crate::settings::Settings;
pub use crate::store::EventStore;
pub use crate::validation::{FieldError, ValidationError};

/// Installs the fmt subscriber. Later calls are no-ops.
pub fn init_tracing(settings: &Settings) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter())
        .without_time()
        .try_init();
}

/// Opens the store described by `settings`.
pub fn open_store(settings: &Settings) -> Result<EventStore, StoreError> {
    match &settings.data_file {
        Some(path) => EventStore::open(path.clone()),
        None => {
            info!("no data file configured, events are kept in memory");
            Ok(EventStore::in_memory())
        }
    }
}

/// Reads settings from the environment, sets up logging and opens the store.
pub fn bootstrap() -> Result<EventStore, Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_tracing(&settings);

    let store = open_store(&settings)?;
    info!(
        persistent = store.snapshot_path().is_some(),
        "class events store ready"
    );
    Ok(store)
}
