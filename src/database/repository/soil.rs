use async_trait::async_trait;
use sqlx::{postgres::PgArguments, query::QueryAs, PgPool, Postgres, QueryBuilder};

use super::{not_found, OwnedRecords};
use crate::database::filter::{contains_pattern, DateRange};
use crate::database::manager::{Database, DatabaseError};
use crate::database::models::soil::{SoilDetails, SoilRecord, SoilRow};
use crate::database::pagination::{PageRequest, Paginated};

/// Column order here must match [`bind_details`].
const DETAIL_COLUMNS: [&str; 29] = [
    "add_number",
    "location",
    "crop",
    "plot_size",
    "average_yield",
    "demand_n",
    "demand_p2o5",
    "demand_k2o",
    "supply_n",
    "supply_p2o5",
    "supply_k2o",
    "supplement_n",
    "supplement_p2o5",
    "supplement_k2o",
    "organic_fertilizer_name",
    "organic_fertilizer_amount",
    "nitrogen_replenish_name",
    "nitrogen_replenish_weight",
    "phosphorus_replenish_name",
    "phosphorus_replenish_weight",
    "potassium_replenish_name",
    "potassium_replenish_weight",
    "nitrogen_basic_name",
    "nitrogen_basic_weight",
    "phosphorus_basic_name",
    "phosphorus_basic_weight",
    "potassium_basic_name",
    "potassium_basic_weight",
    "custom_ratios",
];

type SoilQuery<'q> = QueryAs<'q, Postgres, SoilRow, PgArguments>;

fn bind_details<'q>(query: SoilQuery<'q>, d: &'q SoilDetails) -> SoilQuery<'q> {
    query
        .bind(d.add_number)
        .bind(&d.location)
        .bind(&d.crop)
        .bind(d.plot_size)
        .bind(d.average_yield)
        .bind(d.fertilizer_demand.n)
        .bind(d.fertilizer_demand.p2o5)
        .bind(d.fertilizer_demand.k2o)
        .bind(d.total_supply.n)
        .bind(d.total_supply.p2o5)
        .bind(d.total_supply.k2o)
        .bind(d.supplement.n)
        .bind(d.supplement.p2o5)
        .bind(d.supplement.k2o)
        .bind(&d.organic_fertilizer.name)
        .bind(d.organic_fertilizer.amount)
        .bind(&d.nitrogen_replenish.name)
        .bind(d.nitrogen_replenish.weight)
        .bind(&d.phosphorus_replenish.name)
        .bind(d.phosphorus_replenish.weight)
        .bind(&d.potassium_replenish.name)
        .bind(d.potassium_replenish.weight)
        .bind(&d.nitrogen_basic.name)
        .bind(d.nitrogen_basic.weight)
        .bind(&d.phosphorus_basic.name)
        .bind(d.phosphorus_basic.weight)
        .bind(&d.potassium_basic.name)
        .bind(d.potassium_basic.weight)
        .bind(&d.custom_ratios)
}

fn record_columns() -> String {
    format!("id, user_id, {}, created_at, updated_at", DETAIL_COLUMNS.join(", "))
}

fn insert_sql() -> String {
    let placeholders: Vec<String> = (2..=DETAIL_COLUMNS.len() + 1).map(|n| format!("${n}")).collect();
    format!(
        "INSERT INTO soil_records (user_id, {}) VALUES ($1, {}) RETURNING {}",
        DETAIL_COLUMNS.join(", "),
        placeholders.join(", "),
        record_columns()
    )
}

fn update_sql() -> String {
    let assignments: Vec<String> = DETAIL_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 1))
        .collect();
    let id_param = DETAIL_COLUMNS.len() + 1;
    format!(
        "UPDATE soil_records SET {}, updated_at = NOW() WHERE id = ${} AND user_id = ${} RETURNING {}",
        assignments.join(", "),
        id_param,
        id_param + 1,
        record_columns()
    )
}

#[derive(Debug, Clone, Default)]
pub struct SoilFilter {
    pub created: DateRange,
    pub location: Option<String>,
    pub crop: Option<String>,
}

#[derive(Clone)]
pub struct SoilRepository {
    pool: PgPool,
}

impl SoilRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    fn filtered(select: &str, owner: i64, filter: &SoilFilter) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" FROM soil_records WHERE user_id = ").push_bind(owner);
        filter.created.push_conditions(&mut qb, "created_at");
        if let Some(location) = &filter.location {
            qb.push(" AND location ILIKE ").push_bind(contains_pattern(location));
        }
        if let Some(crop) = &filter.crop {
            qb.push(" AND crop ILIKE ").push_bind(contains_pattern(crop));
        }
        qb
    }
}

#[async_trait]
impl OwnedRecords for SoilRepository {
    type Input = SoilDetails;
    type Record = SoilRecord;
    type Filter = SoilFilter;

    const ENTITY: &'static str = "Soil record";

    async fn create(&self, owner: i64, input: &SoilDetails) -> Result<SoilRecord, DatabaseError> {
        let sql = insert_sql();
        let row = bind_details(sqlx::query_as::<_, SoilRow>(&sql).bind(owner), input)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::write_failed)?;
        Ok(row.into())
    }

    async fn get(&self, owner: i64, id: i64) -> Result<SoilRecord, DatabaseError> {
        let sql = format!("SELECT {} FROM soil_records WHERE id = $1 AND user_id = $2", record_columns());
        let row = sqlx::query_as::<_, SoilRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(not_found::<Self>)?;
        Ok(row.into())
    }

    async fn list(
        &self,
        owner: i64,
        filter: &SoilFilter,
        page: PageRequest,
    ) -> Result<Paginated<SoilRecord>, DatabaseError> {
        let mut page_qb = Self::filtered(&format!("SELECT {}", record_columns()), owner, filter);
        page_qb
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let mut count_qb = Self::filtered("SELECT COUNT(*)", owner, filter);

        let (rows, total) = futures::try_join!(
            page_qb.build_query_as::<SoilRow>().fetch_all(&self.pool),
            count_qb.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        let items = rows.into_iter().map(SoilRecord::from).collect();
        Ok(Paginated::new(items, total, page))
    }

    async fn update(&self, owner: i64, id: i64, input: &SoilDetails) -> Result<SoilRecord, DatabaseError> {
        let sql = update_sql();
        let row = bind_details(sqlx::query_as::<_, SoilRow>(&sql), input)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::write_failed)?
            .ok_or_else(not_found::<Self>)?;
        Ok(row.into())
    }

    async fn delete(&self, owner: i64, id: i64) -> Result<(), DatabaseError> {
        let deleted = sqlx::query("DELETE FROM soil_records WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::write_failed)?
            .rows_affected();

        if deleted == 0 {
            return Err(not_found::<Self>());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_binds_owner_then_every_detail_column() {
        let sql = insert_sql();
        assert!(sql.starts_with("INSERT INTO soil_records (user_id, add_number, location,"));
        assert!(sql.contains("VALUES ($1, $2, $3,"));
        assert!(sql.contains("$30)"));
        assert!(!sql.contains("$31"));
    }

    #[test]
    fn update_scopes_by_id_and_owner_after_details() {
        let sql = update_sql();
        assert!(sql.starts_with("UPDATE soil_records SET add_number = $1, location = $2,"));
        assert!(sql.contains("custom_ratios = $29, updated_at = NOW() WHERE id = $30 AND user_id = $31"));
    }

    #[test]
    fn location_and_crop_filters_combine() {
        let filter = SoilFilter {
            created: DateRange::default(),
            location: Some("north".into()),
            crop: Some("maize".into()),
        };
        let qb = SoilRepository::filtered("SELECT COUNT(*)", 2, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM soil_records WHERE user_id = $1 AND location ILIKE $2 AND crop ILIKE $3"
        );
    }
}
