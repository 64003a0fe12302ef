// handlers/protected/records.rs - owner-scoped CRUD for compost, irrigation and soil
//
// One set of generic handlers serves all three record types; the router picks
// the repository with a turbofish, e.g. `post(records::save::<CompostRepository>)`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRef, Query, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::database::filter::{search_term, DateRange};
use crate::database::pagination::PageRequest;
use crate::database::repository::{CompostFilter, IrrigationFilter, OwnedRecords, SoilFilter};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, PagedResponse, PagedResult};
use crate::state::AppState;

/// Query string accepted by every `/records` list endpoint. Values stay
/// strings so that bad numbers produce our own validation error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub source_query: Option<String>,
    pub query: Option<String>,
    pub location: Option<String>,
    pub crop: Option<String>,
}

impl ListQuery {
    fn date_range(&self) -> Result<DateRange, ApiError> {
        DateRange::parse(self.start_date.as_deref(), self.end_date.as_deref())
            .map_err(|msg| ApiError::field_error("startDate", msg))
    }

    fn page_request(&self, config: &AppConfig) -> Result<PageRequest, ApiError> {
        Ok(PageRequest::from_params(
            self.page.as_deref(),
            self.page_size.as_deref(),
            config.api.default_page_size,
            config.api.max_page_size,
        )?)
    }
}

/// Builds a repository filter from the list query string.
pub trait FromListQuery: Sized {
    fn from_list_query(query: &ListQuery) -> Result<Self, ApiError>;
}

impl FromListQuery for CompostFilter {
    fn from_list_query(query: &ListQuery) -> Result<Self, ApiError> {
        Ok(Self {
            created: query.date_range()?,
            source_query: search_term(query.source_query.as_deref()),
        })
    }
}

impl FromListQuery for IrrigationFilter {
    fn from_list_query(query: &ListQuery) -> Result<Self, ApiError> {
        Ok(Self {
            created: query.date_range()?,
            mode_query: search_term(query.query.as_deref()),
        })
    }
}

impl FromListQuery for SoilFilter {
    fn from_list_query(query: &ListQuery) -> Result<Self, ApiError> {
        Ok(Self {
            created: query.date_range()?,
            location: search_term(query.location.as_deref()),
            crop: search_term(query.crop.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    fn record_id(&self) -> Result<i64, ApiError> {
        self.id
            .as_deref()
            .map(str::trim)
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| ApiError::field_error("id", "id must be a positive integer"))
    }
}

fn record_id(query: Result<Query<IdQuery>, QueryRejection>) -> Result<i64, ApiError> {
    let Query(query) = query?;
    query.record_id()
}

/// POST /{kind}/save - Create a record (and its children) for the caller
pub async fn save<R>(
    State(repo): State<R>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<R::Input>, JsonRejection>,
) -> ApiResult<R::Record>
where
    R: OwnedRecords + FromRef<AppState>,
{
    let Json(input) = payload?;
    let record = repo.create(auth_user.user_id, &input).await?;
    Ok(ApiResponse::created(record))
}

/// GET /{kind}/records - Page through the caller's records, newest first
///
/// Query: `page`, `pageSize`, `startDate`, `endDate`, plus the type's search
/// fields (`sourceQuery`, `query`, or `location`/`crop`).
pub async fn list<R>(
    State(repo): State<R>,
    State(config): State<Arc<AppConfig>>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> PagedResult<R::Record>
where
    R: OwnedRecords + FromRef<AppState>,
    R::Filter: FromListQuery,
{
    let Query(query) = query?;
    let page = query.page_request(&config)?;
    let filter = R::Filter::from_list_query(&query)?;

    let result = repo.list(auth_user.user_id, &filter, page).await?;
    Ok(PagedResponse::from(result))
}

/// GET /{kind}/record?id= - One record with its children
pub async fn get<R>(
    State(repo): State<R>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<R::Record>
where
    R: OwnedRecords + FromRef<AppState>,
{
    let id = record_id(query)?;
    Ok(ApiResponse::success(repo.get(auth_user.user_id, id).await?))
}

/// PUT /{kind}/record?id= - Replace a record and its whole child set
pub async fn update<R>(
    State(repo): State<R>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<R::Input>, JsonRejection>,
) -> ApiResult<R::Record>
where
    R: OwnedRecords + FromRef<AppState>,
{
    let id = record_id(query)?;
    let Json(input) = payload?;
    let record = repo.update(auth_user.user_id, id, &input).await?;
    Ok(ApiResponse::success(record).with_message("updated"))
}

/// DELETE /{kind}/record?id=
pub async fn delete<R>(
    State(repo): State<R>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Value>
where
    R: OwnedRecords + FromRef<AppState>,
{
    let id = record_id(query)?;
    repo.delete(auth_user.user_id, id).await?;
    Ok(ApiResponse::success(json!({ "id": id })).with_message("deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        let mut q = ListQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "page" => q.page = value,
                "pageSize" => q.page_size = value,
                "startDate" => q.start_date = value,
                "endDate" => q.end_date = value,
                "sourceQuery" => q.source_query = value,
                "query" => q.query = value,
                "location" => q.location = value,
                "crop" => q.crop = value,
                other => panic!("unknown key {other}"),
            }
        }
        q
    }

    #[test]
    fn filters_pick_their_own_search_fields() {
        let q = query(&[("sourceQuery", " straw "), ("query", "drip"), ("crop", "")]);

        let compost = CompostFilter::from_list_query(&q).unwrap();
        assert_eq!(compost.source_query.as_deref(), Some("straw"));

        let irrigation = IrrigationFilter::from_list_query(&q).unwrap();
        assert_eq!(irrigation.mode_query.as_deref(), Some("drip"));

        let soil = SoilFilter::from_list_query(&q).unwrap();
        assert_eq!(soil.crop, None);
        assert_eq!(soil.location, None);
    }

    #[test]
    fn bad_dates_are_validation_errors() {
        let q = query(&[("startDate", "last week")]);
        let err = CompostFilter::from_list_query(&q).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn page_request_uses_configured_limits() {
        let config = AppConfig::for_tests("postgres://localhost/agri");
        let page = query(&[("page", "3")]).page_request(&config).unwrap();
        assert_eq!(page, PageRequest { page: 3, page_size: 10 });

        assert!(query(&[("pageSize", "0")]).page_request(&config).is_err());
        assert!(query(&[("pageSize", "1000")]).page_request(&config).is_err());
    }

    #[test]
    fn record_ids_must_be_positive_integers() {
        let id = |raw: Option<&str>| IdQuery { id: raw.map(String::from) }.record_id();
        assert_eq!(id(Some("15")).unwrap(), 15);
        assert!(id(Some("0")).is_err());
        assert!(id(Some("abc")).is_err());
        assert!(id(None).is_err());
    }
}
