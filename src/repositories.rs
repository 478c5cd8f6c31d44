use crate::{
    domain::{LikeOutcome, MemeRepository},
    errors::RepoError,
    models::{self, Meme, MemeFilter, Page, Report, SortOrder, Timeframe},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::update_item::{UpdateItemError, UpdateItemOutput},
    types::{AttributeValue, ReturnValue},
    Client as DynamoDbClient,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{self, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DynamoDbMemeRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbMemeRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbMemeRepository");
        Self { client, table_name }
    }

    /// Scans the whole table, following LastEvaluatedKey pagination. Listing
    /// and trending filter the result in memory; fine at this collection size.
    async fn scan_all(&self) -> Result<Vec<Meme>, RepoError> {
        tracing::debug!("DynamoDB: Scanning table '{}' for all memes", self.table_name);
        let mut memes: Vec<Meme> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request_builder = self.client.scan().table_name(&self.table_name);

            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
                .map_err(RepoError::BackendError)?;

            if let Some(items) = resp.items {
                for item in items {
                    match item_to_meme(&item) {
                        Some(meme) => memes.push(meme),
                        None => {
                            let item_id = item.get("id").and_then(|v| v.as_s().ok());
                            tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item from scan into Meme");
                            // Fail fast if data in the table is corrupt
                            return Err(RepoError::DataCorruption(format!(
                                "DynamoDB: Failed to parse item {:?} during scan of table '{}'",
                                item_id, self.table_name
                            )));
                        }
                    }
                }
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
            tracing::debug!("DynamoDB Scan (table: {}): Continuing with LastEvaluatedKey...", self.table_name);
        }

        tracing::debug!("DynamoDB (table: {}): Scan complete, {} memes", self.table_name, memes.len());
        Ok(memes)
    }

    /// One conditional update per toggle direction; the condition on set
    /// membership keeps `likes` and `liked_by` consistent under races.
    /// Returns `None` when the condition did not hold.
    async fn try_toggle(
        &self,
        id: Uuid,
        user_id: &str,
        like: bool,
    ) -> Result<Option<UpdateItemOutput>, RepoError> {
        let (update, condition) = if like {
            (
                "SET #likes = #likes + :one ADD #liked_by :user_set",
                "attribute_exists(#id) AND NOT contains(#liked_by, :user)",
            )
        } else {
            (
                "SET #likes = #likes - :one DELETE #liked_by :user_set",
                "attribute_exists(#id) AND contains(#liked_by, :user)",
            )
        };

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression(update)
            .condition_expression(condition)
            .expression_attribute_names("#id", "id")
            .expression_attribute_names("#likes", "likes")
            .expression_attribute_names("#liked_by", "liked_by")
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .expression_attribute_values(":user", AttributeValue::S(user_id.to_string()))
            .expression_attribute_values(":user_set", AttributeValue::Ss(vec![user_id.to_string()]))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => Ok(Some(output)),
            Err(e) if is_conditional_failure(&e) => Ok(None),
            Err(e) => Err(RepoError::BackendError(anyhow::Error::new(e).context(
                format!("DynamoDB (table: {}): Failed to toggle like (id: {})", self.table_name, id),
            ))),
        }
    }
}

fn is_conditional_failure(err: &SdkError<UpdateItemError>) -> bool {
    matches!(err, SdkError::ServiceError(service_err)
        if service_err.err().is_conditional_check_failed_exception())
}

#[async_trait]
impl MemeRepository for DynamoDbMemeRepository {
    /// Stores a `Meme` in the DynamoDB table using PutItem.
    async fn create(&self, meme: &Meme) -> Result<(), RepoError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("id", AttributeValue::S(meme.id.to_string()))
            .item("image_url", AttributeValue::S(meme.image_url.clone()))
            .item("media_id", AttributeValue::S(meme.media_id.clone()))
            .item("caption", AttributeValue::S(meme.caption.clone()))
            .item("category", AttributeValue::S(meme.category.to_string()))
            .item(
                "tags",
                AttributeValue::L(meme.tags.iter().map(|t| AttributeValue::S(t.clone())).collect()),
            )
            .item("likes", AttributeValue::N(meme.likes.to_string()))
            .item("report_count", AttributeValue::N(meme.report_count.to_string()))
            .item("reported_by", AttributeValue::L(reports_to_list(&meme.reported_by)))
            .item("owner_id", AttributeValue::S(meme.owner_id.clone()))
            .item("created_at", AttributeValue::S(meme.created_at.to_rfc3339()));

        // DynamoDB string sets cannot be empty; absence means nobody likes it yet.
        if !meme.liked_by.is_empty() {
            request = request.item("liked_by", AttributeValue::Ss(meme.liked_by.clone()));
        }

        request
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put meme (id: {})", self.table_name, meme.id))
            .map_err(RepoError::BackendError)?;
        Ok(())
    }

    /// Retrieves a `Meme` from DynamoDB using GetItem.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError> {
        let id_str = id.to_string();
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id_str.clone()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get meme (id: {})", self.table_name, id_str))
            .map_err(RepoError::BackendError)?;

        match resp.item {
            Some(item) => match item_to_meme(&item) {
                Some(meme) => Ok(Some(meme)),
                None => {
                    tracing::error!(meme_id = %id_str, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into Meme");
                    Err(RepoError::DataCorruption(format!(
                        "Failed to parse meme data retrieved from DynamoDB table '{}' for id {}",
                        self.table_name, id_str
                    )))
                }
            },
            None => Ok(None), // Item not found is not an error
        }
    }

    async fn list(&self, filter: &MemeFilter, sort: SortOrder, page: Page) -> Result<Vec<Meme>, RepoError> {
        let memes = self.scan_all().await?;
        Ok(models::select_page(memes, filter, sort, page))
    }

    async fn trending(&self, timeframe: Timeframe) -> Result<Vec<Meme>, RepoError> {
        let memes = self.scan_all().await?;
        Ok(models::trending_slice(memes, timeframe, Utc::now()))
    }

    /// Flips the like by attempting the conditional add first and falling
    /// back to the conditional remove when the user is already in the set.
    async fn toggle_like(&self, id: Uuid, user_id: &str) -> Result<LikeOutcome, RepoError> {
        if let Some(output) = self.try_toggle(id, user_id, true).await? {
            return Ok(LikeOutcome { liked: true, likes: likes_from_output(&output, id)? });
        }
        if let Some(output) = self.try_toggle(id, user_id, false).await? {
            return Ok(LikeOutcome { liked: false, likes: likes_from_output(&output, id)? });
        }

        // Both conditions failed: either the record is gone or a concurrent
        // toggle by the same user slipped in between the two attempts.
        match self.get_by_id(id).await? {
            None => Err(RepoError::NotFound(id)),
            Some(_) => Err(RepoError::BackendError(anyhow::anyhow!(
                "like toggle for meme {} raced with a concurrent toggle",
                id
            ))),
        }
    }

    /// Appends a report unless this user already reported the meme. The
    /// append and the counter increment are a single document update.
    async fn add_report(&self, id: Uuid, user_id: &str, reason: &str) -> Result<bool, RepoError> {
        let meme = self.get_by_id(id).await?.ok_or(RepoError::NotFound(id))?;
        if meme.reported_by.iter().any(|r| r.user_id == user_id) {
            tracing::debug!(meme_id = %id, %user_id, "Duplicate report ignored");
            return Ok(false);
        }

        let report_entry = AttributeValue::M(HashMap::from([
            ("user_id".to_string(), AttributeValue::S(user_id.to_string())),
            ("reason".to_string(), AttributeValue::S(reason.to_string())),
        ]));

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression(
                "SET #reported_by = list_append(if_not_exists(#reported_by, :empty), :report), \
                 #report_count = #report_count + :one",
            )
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", "id")
            .expression_attribute_names("#reported_by", "reported_by")
            .expression_attribute_names("#report_count", "report_count")
            .expression_attribute_values(":report", AttributeValue::L(vec![report_entry]))
            .expression_attribute_values(":empty", AttributeValue::L(vec![]))
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_conditional_failure(&e) => Err(RepoError::NotFound(id)),
            Err(e) => Err(RepoError::BackendError(anyhow::Error::new(e).context(
                format!("DynamoDB (table: {}): Failed to report meme (id: {})", self.table_name, id),
            ))),
        }
    }

    /// Deletes an item from DynamoDB using DeleteItem.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let id_str = id.to_string();
        tracing::debug!(meme_id = %id_str, table_name = %self.table_name, "DynamoDB: Deleting item");

        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id_str.clone()))
            // DeleteItem succeeds even if item not found
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to delete meme (id: {})", self.table_name, id_str))
            .map_err(RepoError::BackendError)?;

        tracing::debug!(meme_id = %id_str, table_name = %self.table_name, "DynamoDB: Delete request sent");
        Ok(())
    }
}

fn likes_from_output(output: &UpdateItemOutput, id: Uuid) -> Result<u64, RepoError> {
    output
        .attributes()
        .and_then(|attrs| attrs.get("likes"))
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<u64>().ok())
        .ok_or_else(|| {
            RepoError::DataCorruption(format!("missing or invalid likes counter on meme {}", id))
        })
}

fn reports_to_list(reports: &[Report]) -> Vec<AttributeValue> {
    reports
        .iter()
        .map(|r| {
            AttributeValue::M(HashMap::from([
                ("user_id".to_string(), AttributeValue::S(r.user_id.clone())),
                ("reason".to_string(), AttributeValue::S(r.reason.clone())),
            ]))
        })
        .collect()
}

// Helper function to convert a DynamoDB item map to a Meme struct.
fn item_to_meme(item: &HashMap<String, AttributeValue>) -> Option<Meme> {
    let id = item
        .get("id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let image_url = item.get("image_url")?.as_s().ok()?.to_string();
    let media_id = item.get("media_id")?.as_s().ok()?.to_string();
    let caption = item.get("caption")?.as_s().ok()?.to_string();
    let category = item
        .get("category")?
        .as_s()
        .ok()
        .and_then(|s| crate::models::Category::parse(s))?;
    let tags = match item.get("tags") {
        Some(v) => v
            .as_l()
            .ok()?
            .iter()
            .map(|t| t.as_s().ok().map(|s| s.to_string()))
            .collect::<Option<Vec<_>>>()?,
        None => Vec::new(),
    };
    let likes = item.get("likes")?.as_n().ok()?.parse::<u64>().ok()?;
    // Absent liked_by set means nobody currently likes the meme.
    let liked_by = match item.get("liked_by") {
        Some(v) => v.as_ss().ok()?.clone(),
        None => Vec::new(),
    };
    let report_count = item.get("report_count")?.as_n().ok()?.parse::<u64>().ok()?;
    let reported_by = match item.get("reported_by") {
        Some(v) => v
            .as_l()
            .ok()?
            .iter()
            .map(|entry| {
                let map = entry.as_m().ok()?;
                Some(Report {
                    user_id: map.get("user_id")?.as_s().ok()?.to_string(),
                    reason: map.get("reason")?.as_s().ok()?.to_string(),
                })
            })
            .collect::<Option<Vec<_>>>()?,
        None => Vec::new(),
    };
    let owner_id = item.get("owner_id")?.as_s().ok()?.to_string();
    let created_at = item
        .get("created_at")?
        .as_s()
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
        .with_timezone(&Utc);

    Some(Meme {
        id,
        image_url,
        media_id,
        caption,
        category,
        tags,
        likes,
        liked_by,
        report_count,
        reported_by,
        owner_id,
        created_at,
    })
}
