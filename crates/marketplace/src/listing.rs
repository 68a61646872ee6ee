//! Public listing of published experiences.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::{Experience, ExperienceId, ExperienceQuery, SortOrder};

use crate::{Error, Marketplace, Result};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Listing parameters as supplied by a caller.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub location: Option<String>,
    /// Only experiences starting at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    pub sort: SortOrder,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            location: None,
            from: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            sort: SortOrder::Asc,
        }
    }
}

/// The public projection of an experience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperienceSummary {
    pub id: ExperienceId,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub price: i64,
    pub start_time: DateTime<Utc>,
}

impl From<Experience> for ExperienceSummary {
    fn from(e: Experience) -> Self {
        Self {
            id: e.id,
            title: e.title,
            description: e.description,
            location: e.location,
            price: e.price,
            start_time: e.start_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperiencePage {
    pub page: u32,
    pub limit: u32,
    pub count: usize,
    pub experiences: Vec<ExperienceSummary>,
}

impl Marketplace {
    /// List published experiences. No principal is required.
    pub async fn list_experiences(&self, request: ListRequest) -> Result<ExperiencePage> {
        if request.page < 1 {
            return Err(Error::Validation("page must be >= 1".into()));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&request.limit) {
            return Err(Error::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }

        let location = request
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let offset = u64::from(request.page - 1) * u64::from(request.limit);

        let experiences: Vec<ExperienceSummary> = self
            .store
            .list_published(ExperienceQuery {
                location,
                from: request.from,
                sort: request.sort,
                limit: request.limit,
                offset,
            })
            .await?
            .into_iter()
            .map(ExperienceSummary::from)
            .collect();

        Ok(ExperiencePage {
            page: request.page,
            limit: request.limit,
            count: experiences.len(),
            experiences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture, walk};
    use chrono::TimeZone;

    #[tokio::test]
    async fn lists_only_published() {
        let fx = fixture().await;
        let draft = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 1))
            .await
            .unwrap();
        let live = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 2))
            .await
            .unwrap();
        let gone = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 3))
            .await
            .unwrap();
        fx.marketplace.publish_experience(&fx.host, live.id).await.unwrap();
        fx.marketplace.publish_experience(&fx.host, gone.id).await.unwrap();
        fx.marketplace.block_experience(&fx.admin, gone.id).await.unwrap();

        let page = fx
            .marketplace
            .list_experiences(ListRequest::default())
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.experiences[0].id, live.id);
        assert!(page.experiences.iter().all(|e| e.id != draft.id));
    }

    #[tokio::test]
    async fn filters_sorts_and_pages() {
        let fx = fixture().await;
        for (location, day) in [("Lisbon", 5), ("Lisbon", 1), ("Porto", 2), ("Lisbon", 9)] {
            let e = fx
                .marketplace
                .create_experience(&fx.host, walk(location, day))
                .await
                .unwrap();
            fx.marketplace.publish_experience(&fx.admin, e.id).await.unwrap();
        }

        let page = fx
            .marketplace
            .list_experiences(ListRequest {
                location: Some("Lisbon".into()),
                from: Some(Utc.with_ymd_and_hms(2026, 6, 5, 10, 0, 0).unwrap()),
                sort: SortOrder::Desc,
                ..Default::default()
            })
            .await
            .unwrap();
        let days: Vec<_> = page
            .experiences
            .iter()
            .map(|e| e.start_time.format("%d").to_string())
            .collect();
        assert_eq!(days, vec!["09", "05"]);

        let second = fx
            .marketplace
            .list_experiences(ListRequest {
                page: 2,
                limit: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.page, 2);
        assert_eq!(second.count, 1);
        assert_eq!(second.experiences[0].location, "Lisbon");
        assert_eq!(second.experiences[0].start_time.format("%d").to_string(), "09");
    }

    #[tokio::test]
    async fn rejects_bad_paging() {
        let fx = fixture().await;
        for request in [
            ListRequest {
                page: 0,
                ..Default::default()
            },
            ListRequest {
                limit: 0,
                ..Default::default()
            },
            ListRequest {
                limit: MAX_PAGE_LIMIT + 1,
                ..Default::default()
            },
        ] {
            let err = fx.marketplace.list_experiences(request).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }

    #[tokio::test]
    async fn from_bound_respects_sub_second_start_times() {
        let fx = fixture().await;
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()
            + chrono::Duration::milliseconds(200);
        let mut draft = walk("Lisbon", 1);
        draft.start_time = start;

        let experience = fx
            .marketplace
            .create_experience(&fx.host, draft)
            .await
            .unwrap();
        assert_eq!(experience.start_time, start);
        fx.marketplace
            .publish_experience(&fx.host, experience.id)
            .await
            .unwrap();

        let later = fx
            .marketplace
            .list_experiences(ListRequest {
                from: Some(start + chrono::Duration::milliseconds(300)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(later.count, 0);

        let exact = fx
            .marketplace
            .list_experiences(ListRequest {
                from: Some(start),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(exact.count, 1);
        assert_eq!(exact.experiences[0].start_time, start);
    }
}
