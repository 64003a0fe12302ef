use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder, Transaction};

use super::{group_by_parent, not_found, OwnedRecords};
use crate::database::filter::{contains_pattern, DateRange};
use crate::database::manager::{Database, DatabaseError};
use crate::database::models::irrigation::{
    IrrigationAreaRow, IrrigationInput, IrrigationRecord, IrrigationRow,
};
use crate::database::pagination::{PageRequest, Paginated};

const RECORD_COLUMNS: &str = "id, user_id, irrigation_mode, efficiency, crop_type, depth, \
    optimal_moisture, soil_type, field_capacity, soil_density, created_at, updated_at";
const AREA_COLUMNS: &str = "record_id, plot_size, water_flow_rate, tank_size, tank_size_name, \
    water_amount, irrigation_time, fertilizer_start_time, fertilizer_total_time, \
    fertilizer_flow_rate, moisture_points, negative";
const AREA_BINDS: usize = 12;
/// Keeps each INSERT under the Postgres limit of 65535 bind parameters.
const AREAS_PER_INSERT: usize = u16::MAX as usize / AREA_BINDS;

#[derive(Debug, Clone, Default)]
pub struct IrrigationFilter {
    pub created: DateRange,
    /// Substring of the irrigation mode.
    pub mode_query: Option<String>,
}

#[derive(Clone)]
pub struct IrrigationRepository {
    pool: PgPool,
}

impl IrrigationRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    async fn insert_areas(
        tx: &mut Transaction<'_, Postgres>,
        record_id: i64,
        input: &IrrigationInput,
    ) -> Result<(), sqlx::Error> {
        for chunk in input.areas.chunks(AREAS_PER_INSERT) {
            let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO irrigation_areas ({AREA_COLUMNS}) "));
            qb.push_values(chunk, |mut row, area| {
                row.push_bind(record_id)
                    .push_bind(area.plot_size)
                    .push_bind(area.water_flow_rate)
                    .push_bind(area.tank_size)
                    .push_bind(area.tank_size_name.clone())
                    .push_bind(area.water_amount)
                    .push_bind(area.irrigation_time.clone())
                    .push_bind(area.fertilizer_start_time.clone())
                    .push_bind(area.fertilizer_total_time.clone())
                    .push_bind(area.fertilizer_flow_rate)
                    .push_bind(Json(area.moisture_points.clone()))
                    .push_bind(area.negative);
            });
            qb.build().execute(&mut **tx).await?;
        }
        Ok(())
    }

    async fn load_areas(&self, ids: &[i64]) -> Result<Vec<IrrigationAreaRow>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {AREA_COLUMNS} FROM irrigation_areas WHERE record_id = ANY($1) ORDER BY id");
        let rows = sqlx::query_as::<_, IrrigationAreaRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    fn filtered(select: &str, owner: i64, filter: &IrrigationFilter) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" FROM irrigation_records WHERE user_id = ").push_bind(owner);
        filter.created.push_conditions(&mut qb, "created_at");
        if let Some(term) = &filter.mode_query {
            qb.push(" AND irrigation_mode ILIKE ").push_bind(contains_pattern(term));
        }
        qb
    }

    fn from_input(parent: IrrigationRow, input: &IrrigationInput) -> IrrigationRecord {
        let mut record = IrrigationRecord::assemble(parent, Vec::new());
        record.areas = input.areas.clone();
        record
    }
}

#[async_trait]
impl OwnedRecords for IrrigationRepository {
    type Input = IrrigationInput;
    type Record = IrrigationRecord;
    type Filter = IrrigationFilter;

    const ENTITY: &'static str = "Irrigation record";

    async fn create(&self, owner: i64, input: &IrrigationInput) -> Result<IrrigationRecord, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO irrigation_records (user_id, irrigation_mode, efficiency, crop_type, depth, \
             optimal_moisture, soil_type, field_capacity, soil_density) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {RECORD_COLUMNS}"
        );
        let parent = sqlx::query_as::<_, IrrigationRow>(&sql)
            .bind(owner)
            .bind(&input.irrigation_mode)
            .bind(input.efficiency)
            .bind(&input.crop_type)
            .bind(input.depth)
            .bind(input.optimal_moisture)
            .bind(&input.soil_type)
            .bind(input.field_capacity)
            .bind(input.soil_density)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?;

        Self::insert_areas(&mut tx, parent.id, input)
            .await
            .map_err(DatabaseError::write_failed)?;
        tx.commit().await.map_err(DatabaseError::write_failed)?;

        Ok(Self::from_input(parent, input))
    }

    async fn get(&self, owner: i64, id: i64) -> Result<IrrigationRecord, DatabaseError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM irrigation_records WHERE id = $1 AND user_id = $2");
        let parent = sqlx::query_as::<_, IrrigationRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(not_found::<Self>)?;

        let areas = self.load_areas(&[parent.id]).await?;
        Ok(IrrigationRecord::assemble(parent, areas))
    }

    async fn list(
        &self,
        owner: i64,
        filter: &IrrigationFilter,
        page: PageRequest,
    ) -> Result<Paginated<IrrigationRecord>, DatabaseError> {
        let mut page_qb = Self::filtered(&format!("SELECT {RECORD_COLUMNS}"), owner, filter);
        page_qb
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let mut count_qb = Self::filtered("SELECT COUNT(*)", owner, filter);

        let (parents, total) = futures::try_join!(
            page_qb.build_query_as::<IrrigationRow>().fetch_all(&self.pool),
            count_qb.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        let ids: Vec<i64> = parents.iter().map(|p| p.id).collect();
        let mut areas = group_by_parent(self.load_areas(&ids).await?, |a| a.record_id);
        let items = parents
            .into_iter()
            .map(|parent| {
                let children = areas.remove(&parent.id).unwrap_or_default();
                IrrigationRecord::assemble(parent, children)
            })
            .collect();

        Ok(Paginated::new(items, total, page))
    }

    async fn update(&self, owner: i64, id: i64, input: &IrrigationInput) -> Result<IrrigationRecord, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE irrigation_records SET irrigation_mode = $1, efficiency = $2, crop_type = $3, \
             depth = $4, optimal_moisture = $5, soil_type = $6, field_capacity = $7, soil_density = $8, \
             updated_at = NOW() WHERE id = $9 AND user_id = $10 RETURNING {RECORD_COLUMNS}"
        );
        let parent = sqlx::query_as::<_, IrrigationRow>(&sql)
            .bind(&input.irrigation_mode)
            .bind(input.efficiency)
            .bind(&input.crop_type)
            .bind(input.depth)
            .bind(input.optimal_moisture)
            .bind(&input.soil_type)
            .bind(input.field_capacity)
            .bind(input.soil_density)
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?;

        let Some(parent) = parent else {
            tx.rollback().await?;
            return Err(not_found::<Self>());
        };

        sqlx::query("DELETE FROM irrigation_areas WHERE record_id = $1")
            .bind(parent.id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?;
        Self::insert_areas(&mut tx, parent.id, input)
            .await
            .map_err(DatabaseError::write_failed)?;
        tx.commit().await.map_err(DatabaseError::write_failed)?;

        Ok(Self::from_input(parent, input))
    }

    async fn delete(&self, owner: i64, id: i64) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM irrigation_areas WHERE record_id IN \
             (SELECT id FROM irrigation_records WHERE id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::write_failed)?;

        let deleted = sqlx::query("DELETE FROM irrigation_records WHERE id = $1 AND user_id = $2")
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
