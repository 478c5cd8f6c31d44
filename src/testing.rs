//! In-memory implementations of the domain traits for tests. They mirror the
//! DynamoDB repository's semantics by reusing the pure query helpers.

use crate::domain::{CaptionModel, LikeOutcome, MediaObject, MediaStore, MemeRepository};
use crate::errors::{CaptionError, MediaError, RepoError};
use crate::models::{self, Meme, MemeFilter, Page, Report, SortOrder, Timeframe};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryMemeRepository {
    memes: Mutex<HashMap<Uuid, Meme>>,
}

#[async_trait]
impl MemeRepository for InMemoryMemeRepository {
    async fn create(&self, meme: &Meme) -> Result<(), RepoError> {
        self.memes.lock().unwrap().insert(meme.id, meme.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError> {
        Ok(self.memes.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, filter: &MemeFilter, sort: SortOrder, page: Page) -> Result<Vec<Meme>, RepoError> {
        let memes: Vec<Meme> = self.memes.lock().unwrap().values().cloned().collect();
        Ok(models::select_page(memes, filter, sort, page))
    }

    async fn trending(&self, timeframe: Timeframe) -> Result<Vec<Meme>, RepoError> {
        let memes: Vec<Meme> = self.memes.lock().unwrap().values().cloned().collect();
        Ok(models::trending_slice(memes, timeframe, Utc::now()))
    }

    async fn toggle_like(&self, id: Uuid, user_id: &str) -> Result<LikeOutcome, RepoError> {
        let mut memes = self.memes.lock().unwrap();
        let meme = memes.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        let liked = if let Some(pos) = meme.liked_by.iter().position(|u| u == user_id) {
            meme.liked_by.remove(pos);
            meme.likes = meme.likes.saturating_sub(1);
            false
        } else {
            meme.liked_by.push(user_id.to_string());
            meme.likes += 1;
            true
        };
        Ok(LikeOutcome { liked, likes: meme.likes })
    }

    async fn add_report(&self, id: Uuid, user_id: &str, reason: &str) -> Result<bool, RepoError> {
        let mut memes = self.memes.lock().unwrap();
        let meme = memes.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        if meme.reported_by.iter().any(|r| r.user_id == user_id) {
            return Ok(false);
        }
        meme.reported_by.push(Report {
            user_id: user_id.to_string(),
            reason: reason.to_string(),
        });
        meme.report_count += 1;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.memes.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMediaStore {
    objects: Mutex<HashSet<String>>,
}

impl InMemoryMediaStore {
    pub fn contains(&self, media_id: &str) -> bool {
        self.objects.lock().unwrap().contains(media_id)
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(&self, _image_data: &str, folder: &str) -> Result<MediaObject, MediaError> {
        let media_id = format!("{}/{}.jpg", folder, Uuid::new_v4());
        self.objects.lock().unwrap().insert(media_id.clone());
        Ok(MediaObject {
            url: format!("https://media.test/{media_id}"),
            media_id,
        })
    }

    async fn delete(&self, media_id: &str) -> Result<(), MediaError> {
        self.objects.lock().unwrap().remove(media_id);
        Ok(())
    }
}

/// Media store whose operations always fail, for partial-failure tests.
pub struct FailingMediaStore;

#[async_trait]
impl MediaStore for FailingMediaStore {
    async fn upload(&self, _image_data: &str, _folder: &str) -> Result<MediaObject, MediaError> {
        Err(MediaError::UploadFailed("remote store unavailable".to_string()))
    }

    async fn delete(&self, _media_id: &str) -> Result<(), MediaError> {
        Err(MediaError::DeleteFailed("remote store unavailable".to_string()))
    }
}

/// Captioner standing in for a configured-but-failing live model.
pub struct FailingCaptioner;

#[async_trait]
impl CaptionModel for FailingCaptioner {
    async fn generate(&self, _image_data: &str, _tags: &[String]) -> Result<String, CaptionError> {
        Err(CaptionError::QuotaExceeded("quota exhausted".to_string()))
    }
}
