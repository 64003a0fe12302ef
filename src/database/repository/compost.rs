use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::{group_by_parent, not_found, OwnedRecords};
use crate::database::filter::{contains_pattern, DateRange};
use crate::database::manager::{Database, DatabaseError};
use crate::database::models::compost::{CompostInput, CompostRecord, CompostRow, CompostSourceRow};
use crate::database::pagination::{PageRequest, Paginated};

const RECORD_COLUMNS: &str = "id, user_id, all_volume, cn_ratio, density, water_add, created_at, updated_at";
const SOURCE_COLUMNS: &str = "compost_id, source_type, name, weight, carbon, nitrogen, moisture, cn_ratio";
const SOURCE_BINDS: usize = 8;
/// Keeps each INSERT under the Postgres limit of 65535 bind parameters.
const SOURCES_PER_INSERT: usize = u16::MAX as usize / SOURCE_BINDS;

#[derive(Debug, Clone, Default)]
pub struct CompostFilter {
    pub created: DateRange,
    /// Matches any source whose name or type contains the term.
    pub source_query: Option<String>,
}

#[derive(Clone)]
pub struct CompostRepository {
    pool: PgPool,
}

impl CompostRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    async fn insert_sources(
        tx: &mut Transaction<'_, Postgres>,
        compost_id: i64,
        input: &CompostInput,
    ) -> Result<(), sqlx::Error> {
        let sources: Vec<_> = input.tagged_sources().collect();
        for chunk in sources.chunks(SOURCES_PER_INSERT) {
            let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO compost_sources ({SOURCE_COLUMNS}) "));
            qb.push_values(chunk, |mut row, &(kind, source)| {
                row.push_bind(compost_id)
                    .push_bind(kind.as_str())
                    .push_bind(source.name.clone())
                    .push_bind(source.weight)
                    .push_bind(source.carbon)
                    .push_bind(source.nitrogen)
                    .push_bind(source.moisture)
                    .push_bind(source.cn_ratio);
            });
            qb.build().execute(&mut **tx).await?;
        }
        Ok(())
    }

    async fn load_sources(&self, ids: &[i64]) -> Result<Vec<CompostSourceRow>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {SOURCE_COLUMNS} FROM compost_sources WHERE compost_id = ANY($1) ORDER BY id");
        let rows = sqlx::query_as::<_, CompostSourceRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// `<select> FROM compost_records c WHERE c.user_id = $1 ...` with the filter applied.
    fn filtered(select: &str, owner: i64, filter: &CompostFilter) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" FROM compost_records c WHERE c.user_id = ").push_bind(owner);
        filter.created.push_conditions(&mut qb, "c.created_at");
        if let Some(term) = &filter.source_query {
            let pattern = contains_pattern(term);
            qb.push(" AND EXISTS (SELECT 1 FROM compost_sources s WHERE s.compost_id = c.id AND (s.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR s.source_type ILIKE ")
                .push_bind(pattern)
                .push("))");
        }
        qb
    }

    fn from_input(parent: CompostRow, input: &CompostInput) -> CompostRecord {
        let mut record = CompostRecord::assemble(parent, Vec::new());
        record.nitrogen_sources_list = input.nitrogen_sources_list.clone();
        record.carbon_sources_list = input.carbon_sources_list.clone();
        record
    }
}

#[async_trait]
impl OwnedRecords for CompostRepository {
    type Input = CompostInput;
    type Record = CompostRecord;
    type Filter = CompostFilter;

    const ENTITY: &'static str = "Compost record";

    async fn create(&self, owner: i64, input: &CompostInput) -> Result<CompostRecord, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO compost_records (user_id, all_volume, cn_ratio, density, water_add) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {RECORD_COLUMNS}"
        );
        let parent = sqlx::query_as::<_, CompostRow>(&sql)
            .bind(owner)
            .bind(input.all_volume)
            .bind(&input.cn_ratio)
            .bind(&input.density)
            .bind(&input.water_add)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?;

        Self::insert_sources(&mut tx, parent.id, input)
            .await
            .map_err(DatabaseError::write_failed)?;
        tx.commit().await.map_err(DatabaseError::write_failed)?;

        Ok(Self::from_input(parent, input))
    }

    async fn get(&self, owner: i64, id: i64) -> Result<CompostRecord, DatabaseError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM compost_records WHERE id = $1 AND user_id = $2");
        let parent = sqlx::query_as::<_, CompostRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(not_found::<Self>)?;

        let sources = self.load_sources(&[parent.id]).await?;
        Ok(CompostRecord::assemble(parent, sources))
    }

    async fn list(
        &self,
        owner: i64,
        filter: &CompostFilter,
        page: PageRequest,
    ) -> Result<Paginated<CompostRecord>, DatabaseError> {
        let mut page_qb = Self::filtered(
            "SELECT c.id, c.user_id, c.all_volume, c.cn_ratio, c.density, c.water_add, c.created_at, c.updated_at",
            owner,
            filter,
        );
        page_qb
            .push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let mut count_qb = Self::filtered("SELECT COUNT(*)", owner, filter);

        let (parents, total) = futures::try_join!(
            page_qb.build_query_as::<CompostRow>().fetch_all(&self.pool),
            count_qb.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        let ids: Vec<i64> = parents.iter().map(|p| p.id).collect();
        let mut sources = group_by_parent(self.load_sources(&ids).await?, |s| s.compost_id);
        let items = parents
            .into_iter()
            .map(|parent| {
                let children = sources.remove(&parent.id).unwrap_or_default();
                CompostRecord::assemble(parent, children)
            })
            .collect();

        Ok(Paginated::new(items, total, page))
    }

    async fn update(&self, owner: i64, id: i64, input: &CompostInput) -> Result<CompostRecord, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE compost_records SET all_volume = $1, cn_ratio = $2, density = $3, water_add = $4, \
             updated_at = NOW() WHERE id = $5 AND user_id = $6 RETURNING {RECORD_COLUMNS}"
        );
        let parent = sqlx::query_as::<_, CompostRow>(&sql)
            .bind(input.all_volume)
            .bind(&input.cn_ratio)
            .bind(&input.density)
            .bind(&input.water_add)
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?;

        let Some(parent) = parent else {
            tx.rollback().await?;
            return Err(not_found::<Self>());
        };

        sqlx::query("DELETE FROM compost_sources WHERE compost_id = $1")
            .bind(parent.id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?;
        Self::insert_sources(&mut tx, parent.id, input)
            .await
            .map_err(DatabaseError::write_failed)?;
        tx.commit().await.map_err(DatabaseError::write_failed)?;

        Ok(Self::from_input(parent, input))
    }

    async fn delete(&self, owner: i64, id: i64) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM compost_sources WHERE compost_id IN \
             (SELECT id FROM compost_records WHERE id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::write_failed)?;

        let deleted = sqlx::query("DELETE FROM compost_records WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(not_found::<Self>());
        }
        tx.commit().await.map_err(DatabaseError::write_failed)?;
        Ok(())
    }
}
