use crate::errors::{CaptionError, MediaError, RepoError};
use crate::models::{Meme, MemeFilter, Page, SortOrder, Timeframe};
use async_trait::async_trait;
use uuid::Uuid;

/// Handle returned by a successful media upload: the public URL plus the
/// opaque id used later for deletion.
#[derive(Debug, Clone)]
pub struct MediaObject {
    pub url: String,
    pub media_id: String,
}

/// Result of a like toggle: the requesting user's new liked state and the
/// record's new like count.
#[derive(Debug, Clone, Copy)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: u64,
}

/// Trait defining operations for storing and querying Meme metadata.
#[async_trait]
pub trait MemeRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Persists a newly created meme.
    async fn create(&self, meme: &Meme) -> Result<(), RepoError>;

    /// Retrieves a meme by its unique ID. Returns Ok(None) if not found.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError>;

    /// Filtered, sorted, paginated listing.
    async fn list(&self, filter: &MemeFilter, sort: SortOrder, page: Page) -> Result<Vec<Meme>, RepoError>;

    /// Recent memes above the like threshold, most liked first.
    async fn trending(&self, timeframe: Timeframe) -> Result<Vec<Meme>, RepoError>;

    /// Atomically flips the user's like on the meme, keeping `likes` equal to
    /// the size of the liked-by set even under concurrent toggles.
    async fn toggle_like(&self, id: Uuid, user_id: &str) -> Result<LikeOutcome, RepoError>;

    /// Appends a report and bumps the counter, unless the user has already
    /// reported this meme. Returns false for the duplicate no-op case.
    async fn add_report(&self, id: Uuid, user_id: &str, reason: &str) -> Result<bool, RepoError>;

    /// Removes the meme record. Succeeds if the record is already gone.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;
}

/// Trait defining operations against the external media store holding the
/// actual image bytes.
#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    /// Uploads a base64-encoded image (any data-URL prefix is stripped) and
    /// returns its public URL and deletion handle. Not retried on failure.
    async fn upload(&self, image_data: &str, folder: &str) -> Result<MediaObject, MediaError>;

    /// Deletes a previously uploaded object. Idempotency of deleting an
    /// already-deleted id is up to the remote service.
    async fn delete(&self, media_id: &str) -> Result<(), MediaError>;
}

/// Trait for the external caption model. Implementations require a configured
/// credential; the no-credential fallback lives in the service layer.
#[async_trait]
pub trait CaptionModel: Send + Sync + 'static {
    async fn generate(&self, image_data: &str, tags: &[String]) -> Result<String, CaptionError>;
}
