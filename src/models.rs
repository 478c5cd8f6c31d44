use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum like count for a meme to qualify as trending.
pub const TRENDING_MIN_LIKES: u64 = 50;
/// Maximum number of memes returned by a trending query.
pub const TRENDING_CAP: usize = 20;
/// Owner recorded when a meme is created without a user id.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Closed set of meme categories. Creation fails for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Wholesome,
    Relatable,
    Political,
    Dank,
    Dark,
    Tech,
    Animals,
    Sports,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Wholesome,
        Category::Relatable,
        Category::Political,
        Category::Dank,
        Category::Dark,
        Category::Tech,
        Category::Animals,
        Category::Sports,
    ];

    /// Case-sensitive parse; `None` for anything outside the closed set.
    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Wholesome => "Wholesome",
            Category::Relatable => "Relatable",
            Category::Political => "Political",
            Category::Dank => "Dank",
            Category::Dark => "Dark",
            Category::Tech => "Tech",
            Category::Animals => "Animals",
            Category::Sports => "Sports",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single abuse report, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub reason: String,
}

/// The persisted meme entity. Image bytes live in the media store; this is
/// metadata only. Serialized camelCase to match the public API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    pub id: Uuid,
    pub image_url: String,
    /// Opaque handle into the media store, used only for deletion.
    pub media_id: String,
    pub caption: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub likes: u64,
    pub liked_by: Vec<String>,
    pub report_count: u64,
    pub reported_by: Vec<Report>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl Meme {
    /// Builds a fresh meme with zeroed counters, a new id and the current
    /// timestamp.
    pub fn new(
        image_url: String,
        media_id: String,
        caption: String,
        category: Category,
        tags: Vec<String>,
        owner_id: String,
    ) -> Self {
        Meme {
            id: Uuid::new_v4(),
            image_url,
            media_id,
            caption,
            category,
            tags,
            likes: 0,
            liked_by: Vec::new(),
            report_count: 0,
            reported_by: Vec::new(),
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// List sort orders. Unknown values fall back to `Newest`, matching the
/// behavior of the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    MostLiked,
}

impl SortOrder {
    pub fn parse(s: Option<&str>) -> SortOrder {
        match s {
            Some("oldest") => SortOrder::Oldest,
            Some("mostLiked") => SortOrder::MostLiked,
            _ => SortOrder::Newest,
        }
    }
}

/// Trending window. Unknown values fall back to `Week`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    Day,
    #[default]
    Week,
    Month,
}

impl Timeframe {
    pub fn parse(s: Option<&str>) -> Timeframe {
        match s {
            Some("day") => Timeframe::Day,
            Some("month") => Timeframe::Month,
            _ => Timeframe::Week,
        }
    }

    /// Start of the trending window relative to `now`. A month is a calendar
    /// month, not 30 days.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Timeframe::Day => now - Duration::days(1),
            Timeframe::Week => now - Duration::days(7),
            Timeframe::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or_else(|| now - Duration::days(30)),
        }
    }
}

/// Listing filter. The category is kept as a raw string so that a query for
/// a name outside the closed set matches nothing instead of failing.
#[derive(Debug, Clone, Default)]
pub struct MemeFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
}

impl MemeFilter {
    pub fn matches(&self, meme: &Meme) -> bool {
        if let Some(category) = &self.category {
            if meme.category.as_str() != category {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !meme.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}

/// Validated pagination: both fields are at least 1.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

/// Applies filter, sort and pagination to a full result set. The backing
/// store scans and delegates here; the ordering contract is sorted first,
/// then skip `(page - 1) * size`, then take `size`.
pub fn select_page(mut memes: Vec<Meme>, filter: &MemeFilter, sort: SortOrder, page: Page) -> Vec<Meme> {
    memes.retain(|m| filter.matches(m));
    match sort {
        SortOrder::Newest => memes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => memes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::MostLiked => memes.sort_by(|a, b| b.likes.cmp(&a.likes)),
    }
    memes
        .into_iter()
        .skip((page.number - 1) * page.size)
        .take(page.size)
        .collect()
}

/// Trending selection: within the timeframe, at least `TRENDING_MIN_LIKES`
/// likes, most liked first, capped at `TRENDING_CAP`.
pub fn trending_slice(mut memes: Vec<Meme>, timeframe: Timeframe, now: DateTime<Utc>) -> Vec<Meme> {
    let cutoff = timeframe.cutoff(now);
    memes.retain(|m| m.created_at >= cutoff && m.likes >= TRENDING_MIN_LIKES);
    memes.sort_by(|a, b| b.likes.cmp(&a.likes));
    memes.truncate(TRENDING_CAP);
    memes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meme_at(caption: &str, likes: u64, age_days: i64) -> Meme {
        let mut meme = Meme::new(
            "https://example.com/img.jpg".into(),
            "memestream/img.jpg".into(),
            caption.into(),
            Category::Dank,
            vec![],
            "tester".into(),
        );
        meme.likes = likes;
        meme.created_at = Utc::now() - Duration::days(age_days);
        meme
    }

    #[test]
    fn category_parse_is_closed_and_case_sensitive() {
        assert_eq!(Category::parse("Sports"), Some(Category::Sports));
        assert_eq!(Category::parse("sports"), None);
        assert_eq!(Category::parse("Spicy"), None);
    }

    #[test]
    fn sort_order_defaults_to_newest() {
        assert_eq!(SortOrder::parse(None), SortOrder::Newest);
        assert_eq!(SortOrder::parse(Some("mostLiked")), SortOrder::MostLiked);
        assert_eq!(SortOrder::parse(Some("bogus")), SortOrder::Newest);
    }

    #[test]
    fn most_liked_is_non_increasing() {
        let memes = vec![meme_at("a", 3, 1), meme_at("b", 9, 2), meme_at("c", 5, 3)];
        let sorted = select_page(
            memes,
            &MemeFilter::default(),
            SortOrder::MostLiked,
            Page { number: 1, size: 10 },
        );
        let likes: Vec<u64> = sorted.iter().map(|m| m.likes).collect();
        assert_eq!(likes, vec![9, 5, 3]);
    }

    #[test]
    fn oldest_is_non_decreasing() {
        let memes = vec![meme_at("a", 0, 1), meme_at("b", 0, 5), meme_at("c", 0, 3)];
        let sorted = select_page(
            memes,
            &MemeFilter::default(),
            SortOrder::Oldest,
            Page { number: 1, size: 10 },
        );
        for pair in sorted.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
        assert_eq!(sorted[0].caption, "b");
    }

    #[test]
    fn pagination_skips_and_takes() {
        // Ten memes, newest first by construction.
        let memes: Vec<Meme> = (0..10).map(|i| meme_at(&format!("m{i}"), 0, i)).collect();
        let page = select_page(
            memes,
            &MemeFilter::default(),
            SortOrder::Newest,
            Page { number: 2, size: 3 },
        );
        let captions: Vec<&str> = page.iter().map(|m| m.caption.as_str()).collect();
        assert_eq!(captions, vec!["m3", "m4", "m5"]);
    }

    #[test]
    fn filter_by_category_and_tag() {
        let mut sports = meme_at("sports", 0, 1);
        sports.category = Category::Sports;
        sports.tags = vec!["nfl".into()];
        let tech = meme_at("tech", 0, 2);

        let filter = MemeFilter {
            category: Some("Sports".into()),
            tag: None,
        };
        let hits = select_page(
            vec![sports.clone(), tech.clone()],
            &filter,
            SortOrder::Newest,
            Page { number: 1, size: 10 },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].caption, "sports");

        let filter = MemeFilter {
            category: None,
            tag: Some("nfl".into()),
        };
        let hits = select_page(
            vec![sports, tech],
            &filter,
            SortOrder::Newest,
            Page { number: 1, size: 10 },
        );
        assert_eq!(hits.len(), 1);

        // A category outside the closed set matches nothing.
        let filter = MemeFilter {
            category: Some("Spicy".into()),
            tag: None,
        };
        let memes = vec![meme_at("x", 0, 1)];
        assert!(select_page(memes, &filter, SortOrder::Newest, Page { number: 1, size: 10 }).is_empty());
    }

    #[test]
    fn trending_enforces_likes_and_recency() {
        let memes = vec![
            meme_at("hot", 120, 2),
            meme_at("warm", 50, 6),
            meme_at("cold", 500, 10),  // too old for a week window
            meme_at("unloved", 49, 1), // below the like floor
        ];
        let now = Utc::now();
        let trending = trending_slice(memes, Timeframe::Week, now);
        let captions: Vec<&str> = trending.iter().map(|m| m.caption.as_str()).collect();
        assert_eq!(captions, vec!["hot", "warm"]);
        let cutoff = Timeframe::Week.cutoff(now);
        for m in &trending {
            assert!(m.likes >= TRENDING_MIN_LIKES);
            assert!(m.created_at >= cutoff);
        }
    }

    #[test]
    fn trending_caps_results() {
        let memes: Vec<Meme> = (0..30).map(|i| meme_at(&format!("m{i}"), 60 + i, 1)).collect();
        let trending = trending_slice(memes, Timeframe::Week, Utc::now());
        assert_eq!(trending.len(), TRENDING_CAP);
        assert_eq!(trending[0].likes, 89);
    }

    #[test]
    fn timeframe_cutoffs() {
        let now = Utc::now();
        assert_eq!(Timeframe::Day.cutoff(now), now - Duration::days(1));
        assert_eq!(Timeframe::Week.cutoff(now), now - Duration::days(7));
        assert!(Timeframe::Month.cutoff(now) < Timeframe::Week.cutoff(now));
        assert_eq!(Timeframe::parse(Some("nonsense")), Timeframe::Week);
    }

    #[test]
    fn meme_serializes_camel_case() {
        let meme = meme_at("hello", 0, 0);
        let value = serde_json::to_value(&meme).expect("serialize");
        assert!(value.get("imageUrl").is_some());
        assert!(value.get("mediaId").is_some());
        assert!(value.get("likedBy").is_some());
        assert!(value.get("reportCount").is_some());
        assert!(value.get("ownerId").is_some());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["category"], "Dank");
    }
}
