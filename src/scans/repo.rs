use anyhow::Context;
use axum::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;

use super::dto::{Analysis, NewScan, ScanRecord};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn create_scan(&self, scan: NewScan) -> anyhow::Result<ScanRecord>;
    /// All scans, newest first.
    async fn list_scans(&self) -> anyhow::Result<Vec<ScanRecord>>;
}

#[derive(Debug, FromRow)]
struct ScanRow {
    id: i32,
    food_name: String,
    image_url: Option<String>,
    analysis: Json<Analysis>,
    created_at: OffsetDateTime,
}

impl From<ScanRow> for ScanRecord {
    fn from(r: ScanRow) -> Self {
        Self {
            id: r.id,
            food_name: r.food_name,
            image_url: r.image_url,
            analysis: r.analysis.0,
            created_at: r.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgScanStore {
    db: PgPool,
}

impl PgScanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ScanStore for PgScanStore {
    async fn create_scan(&self, scan: NewScan) -> anyhow::Result<ScanRecord> {
        let row = sqlx::query_as::<_, ScanRow>(
            r#"
            INSERT INTO scans (food_name, image_url, analysis)
            VALUES ($1, $2, $3)
            RETURNING id, food_name, image_url, analysis, created_at
            "#,
        )
        .bind(scan.food_name)
        .bind(scan.image_url) // Option<String> → NULL allowed
        .bind(Json(scan.analysis))
        .fetch_one(&self.db)
        .await
        .context("insert scan")?;

        Ok(row.into())
    }

    async fn list_scans(&self) -> anyhow::Result<Vec<ScanRecord>> {
        let rows = sqlx::query_as::<_, ScanRow>(
            r#"
            SELECT id, food_name, image_url, analysis, created_at
              FROM scans
             ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list scans")?;

        Ok(rows.into_iter().map(ScanRecord::from).collect())
    }
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryScanStore;
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn new_scan(name: &str) -> NewScan {
        let mut analysis = Analysis::new();
        analysis.insert("foodName".into(), json!(name));
        NewScan {
            food_name: name.into(),
            image_url: None,
            analysis,
        }
    }

    #[test]
    fn row_maps_into_record() {
        let mut analysis = Analysis::new();
        analysis.insert("foodName".into(), json!("Sushi"));
        analysis.insert("calories".into(), json!(420));
        let row = ScanRow {
            id: 3,
            food_name: "Sushi".into(),
            image_url: Some("data:image/jpeg;base64,AAAA".into()),
            analysis: Json(analysis.clone()),
            created_at: datetime!(2024-06-01 08:00:00 UTC),
        };

        let record = ScanRecord::from(row);
        assert_eq!(record.id, 3);
        assert_eq!(record.image_url.as_deref(), Some("data:image/jpeg;base64,AAAA"));
        assert_eq!(record.analysis, analysis);
    }

    #[tokio::test]
    async fn memory_store_assigns_increasing_ids() {
        let store = MemoryScanStore::default();
        let a = store.create_scan(new_scan("Soup")).await.unwrap();
        let b = store.create_scan(new_scan("Salad")).await.unwrap();
        assert!(b.id > a.id);
        assert!(b.created_at >= a.created_at);
    }

    #[tokio::test]
    async fn memory_store_lists_newest_first() {
        let store = MemoryScanStore::default();
        for name in ["Bagel", "Burrito", "Curry", "Dumplings"] {
            store.create_scan(new_scan(name)).await.unwrap();
        }

        let listed = store.list_scans().await.unwrap();
        assert_eq!(listed.len(), 4);
        assert_eq!(listed[0].food_name, "Dumplings");
        assert!(listed
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at && w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn memory_store_lists_empty() {
        let store = MemoryScanStore::default();
        assert!(store.list_scans().await.unwrap().is_empty());
    }
}
