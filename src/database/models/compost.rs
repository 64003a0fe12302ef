use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One ingredient of a compost mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fertilizer {
    pub name: String,
    #[serde(default)]
    pub weight: f64,
    /// Carbon content, percent.
    #[serde(rename = "c", default)]
    pub carbon: f64,
    /// Nitrogen content, percent.
    #[serde(rename = "n", default)]
    pub nitrogen: f64,
    #[serde(default)]
    pub moisture: f64,
    #[serde(rename = "c_n", default)]
    pub cn_ratio: f64,
}

/// Discriminant of a `compost_sources` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Nitrogen,
    Carbon,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Nitrogen => "nitrogen",
            SourceKind::Carbon => "carbon",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "nitrogen" => Some(SourceKind::Nitrogen),
            "carbon" => Some(SourceKind::Carbon),
            _ => None,
        }
    }
}

/// Body of `POST /compost/save` and `PUT /compost/record`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompostInput {
    #[serde(default)]
    pub nitrogen_sources_list: Vec<Fertilizer>,
    #[serde(default)]
    pub carbon_sources_list: Vec<Fertilizer>,
    #[serde(default)]
    pub all_volume: f64,
    #[serde(rename = "cNRatio", default)]
    pub cn_ratio: String,
    #[serde(default)]
    pub density: String,
    #[serde(default)]
    pub water_add: String,
}

impl CompostInput {
    /// Every source tagged with its list, in request order.
    pub fn tagged_sources(&self) -> impl Iterator<Item = (SourceKind, &Fertilizer)> {
        self.nitrogen_sources_list
            .iter()
            .map(|f| (SourceKind::Nitrogen, f))
            .chain(self.carbon_sources_list.iter().map(|f| (SourceKind::Carbon, f)))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompostRecord {
    pub id: i64,
    pub user_id: i64,
    pub nitrogen_sources_list: Vec<Fertilizer>,
    pub carbon_sources_list: Vec<Fertilizer>,
    pub all_volume: f64,
    #[serde(rename = "cNRatio")]
    pub cn_ratio: String,
    pub density: String,
    pub water_add: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct CompostRow {
    pub id: i64,
    pub user_id: i64,
    pub all_volume: f64,
    pub cn_ratio: String,
    pub density: String,
    pub water_add: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct CompostSourceRow {
    pub compost_id: i64,
    pub source_type: String,
    pub name: String,
    pub weight: f64,
    pub carbon: f64,
    pub nitrogen: f64,
    pub moisture: f64,
    pub cn_ratio: f64,
}

impl From<CompostSourceRow> for Fertilizer {
    fn from(row: CompostSourceRow) -> Self {
        Self {
            name: row.name,
            weight: row.weight,
            carbon: row.carbon,
            nitrogen: row.nitrogen,
            moisture: row.moisture,
            cn_ratio: row.cn_ratio,
        }
    }
}

impl CompostRecord {
    /// Join a parent row with its source rows, splitting them by discriminant.
    /// Rows belonging to other parents are ignored.
    pub fn assemble(parent: CompostRow, sources: impl IntoIterator<Item = CompostSourceRow>) -> Self {
        let mut nitrogen = Vec::new();
        let mut carbon = Vec::new();
        for source in sources.into_iter().filter(|s| s.compost_id == parent.id) {
            match SourceKind::parse(&source.source_type) {
                Some(SourceKind::Nitrogen) => nitrogen.push(source.into()),
                Some(SourceKind::Carbon) => carbon.push(source.into()),
                None => tracing::warn!(
                    "Skipping compost source with unknown type '{}' on record {}",
                    source.source_type,
                    parent.id
                ),
            }
        }

        Self {
            id: parent.id,
            user_id: parent.user_id,
            nitrogen_sources_list: nitrogen,
            carbon_sources_list: carbon,
            all_volume: parent.all_volume,
            cn_ratio: parent.cn_ratio,
            density: parent.density,
            water_add: parent.water_add,
            created_at: parent.created_at,
            updated_at: parent.updated_at,
        }
    }
}
