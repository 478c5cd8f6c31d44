use crate::{
    captions::mock_caption,
    domain::{CaptionModel, LikeOutcome, MediaStore, MemeRepository},
    errors::AppError,
    models::{Category, Meme, MemeFilter, Page, SortOrder, Timeframe, ANONYMOUS_USER},
    storage::DEFAULT_MEDIA_FOLDER,
};
use std::sync::Arc;
use tracing;
use uuid::Uuid;

/// The user id that carries the admin role. Kept behind `Requester` so the
/// rest of the code reasons about capabilities, not magic strings.
const ADMIN_USER_ID: &str = "admin";

/// Identity of the caller of a mutating operation. Untrusted free text, as
/// there is no authentication in this system.
#[derive(Debug, Clone)]
pub struct Requester {
    id: String,
}

impl Requester {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn is_owner(&self, meme: &Meme) -> bool {
        !self.id.is_empty() && meme.owner_id == self.id
    }

    pub fn has_admin_role(&self) -> bool {
        self.id == ADMIN_USER_ID
    }
}

/// Validated input for meme creation.
#[derive(Debug, Clone)]
pub struct NewMeme {
    pub image_data: String,
    pub caption: String,
    pub category: String,
    pub tags: Vec<String>,
    pub owner_id: Option<String>,
}

/// Orchestrates the record store, the media store and the caption model.
/// Holds no mutable state of its own; every operation is a request-scoped
/// sequence of calls against the backing services.
pub struct MemeService {
    repo: Arc<dyn MemeRepository>,
    media: Arc<dyn MediaStore>,
    captioner: Option<Arc<dyn CaptionModel>>,
}

impl MemeService {
    pub fn new(
        repo: Arc<dyn MemeRepository>,
        media: Arc<dyn MediaStore>,
        captioner: Option<Arc<dyn CaptionModel>>,
    ) -> Self {
        Self { repo, media, captioner }
    }

    pub async fn list_memes(
        &self,
        filter: &MemeFilter,
        sort: SortOrder,
        page: Page,
    ) -> Result<Vec<Meme>, AppError> {
        Ok(self.repo.list(filter, sort, page).await?)
    }

    pub async fn trending_memes(&self, timeframe: Timeframe) -> Result<Vec<Meme>, AppError> {
        Ok(self.repo.trending(timeframe).await?)
    }

    /// Uploads the image, then persists the record. If persistence fails the
    /// uploaded object is left behind; there is no compensating delete.
    pub async fn create_meme(&self, input: NewMeme) -> Result<Meme, AppError> {
        if input.image_data.is_empty() || input.caption.trim().is_empty() || input.category.is_empty() {
            return Err(AppError::Validation(
                "Please provide image, caption, and category".to_string(),
            ));
        }
        let category = Category::parse(&input.category).ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid category '{}'. Valid categories: {}",
                input.category,
                Category::ALL.map(|c| c.as_str()).join(", ")
            ))
        })?;

        let media = self.media.upload(&input.image_data, DEFAULT_MEDIA_FOLDER).await?;

        let meme = Meme::new(
            media.url,
            media.media_id,
            input.caption.trim().to_string(),
            category,
            input.tags,
            input.owner_id.filter(|o| !o.is_empty()).unwrap_or_else(|| ANONYMOUS_USER.to_string()),
        );
        self.repo.create(&meme).await?;

        tracing::info!(meme_id = %meme.id, category = %meme.category, "Meme created successfully");
        Ok(meme)
    }

    pub async fn toggle_like(&self, id: Uuid, user_id: &str) -> Result<LikeOutcome, AppError> {
        if user_id.is_empty() {
            return Err(AppError::Validation("User ID is required".to_string()));
        }
        self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)?;

        let outcome = self.repo.toggle_like(id, user_id).await?;
        tracing::debug!(meme_id = %id, %user_id, liked = outcome.liked, likes = outcome.likes, "Like toggled");
        Ok(outcome)
    }

    /// Records a report; a repeat report by the same user is a silent no-op.
    pub async fn report_meme(
        &self,
        id: Uuid,
        user_id: &str,
        reason: Option<String>,
    ) -> Result<(), AppError> {
        if user_id.is_empty() {
            return Err(AppError::Validation("User ID is required".to_string()));
        }
        self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)?;

        let reason = reason.filter(|r| !r.is_empty()).unwrap_or_else(|| "Not specified".to_string());
        let recorded = self.repo.add_report(id, user_id, &reason).await?;
        if recorded {
            tracing::info!(meme_id = %id, %user_id, "Meme reported");
        }
        Ok(())
    }

    /// Deletes the media object first, then the record. A media-store failure
    /// aborts the operation and leaves the record in place.
    pub async fn delete_meme(&self, id: Uuid, requester: &Requester) -> Result<(), AppError> {
        let meme = self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)?;

        if !requester.is_owner(&meme) && !requester.has_admin_role() {
            return Err(AppError::Forbidden);
        }

        self.media.delete(&meme.media_id).await?;
        self.repo.delete(id).await?;

        tracing::info!(meme_id = %id, "Meme deleted successfully");
        Ok(())
    }

    /// With no captioner configured, the static mock answers. A configured
    /// captioner that fails surfaces its error; it never falls back to the
    /// mock at runtime.
    pub async fn generate_caption(
        &self,
        image_data: &str,
        tags: &[String],
    ) -> Result<String, AppError> {
        if image_data.is_empty() {
            return Err(AppError::Validation("Image data is required".to_string()));
        }
        match &self.captioner {
            None => Ok(mock_caption(tags)),
            Some(captioner) => Ok(captioner.generate(image_data, tags).await?),
        }
    }
}
