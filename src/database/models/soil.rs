use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// N / P2O5 / K2O amounts, kg per mu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTriad {
    #[serde(default)]
    pub n: f64,
    #[serde(default)]
    pub p2o5: f64,
    #[serde(default)]
    pub k2o: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FertilizerPortion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganicFertilizer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: f64,
}

/// Everything about a soil test except identity and timestamps. Doubles as
/// the request body for save and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoilDetails {
    pub add_number: i32,
    pub location: String,
    pub crop: String,
    pub plot_size: f64,
    pub average_yield: f64,
    pub organic_fertilizer: OrganicFertilizer,
    pub fertilizer_demand: NutrientTriad,
    pub total_supply: NutrientTriad,
    pub supplement: NutrientTriad,
    pub nitrogen_replenish: FertilizerPortion,
    pub phosphorus_replenish: FertilizerPortion,
    pub potassium_replenish: FertilizerPortion,
    pub nitrogen_basic: FertilizerPortion,
    pub phosphorus_basic: FertilizerPortion,
    pub potassium_basic: FertilizerPortion,
    pub custom_ratios: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilRecord {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub details: SoilDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `soil_records` stores the nested groups as flat columns.
#[derive(Debug, FromRow)]
pub struct SoilRow {
    pub id: i64,
    pub user_id: i64,
    pub add_number: i32,
    pub location: String,
    pub crop: String,
    pub plot_size: f64,
    pub average_yield: f64,
    pub demand_n: f64,
    pub demand_p2o5: f64,
    pub demand_k2o: f64,
    pub supply_n: f64,
    pub supply_p2o5: f64,
    pub supply_k2o: f64,
    pub supplement_n: f64,
    pub supplement_p2o5: f64,
    pub supplement_k2o: f64,
    pub organic_fertilizer_name: String,
    pub organic_fertilizer_amount: f64,
    pub nitrogen_replenish_name: String,
    pub nitrogen_replenish_weight: f64,
    pub phosphorus_replenish_name: String,
    pub phosphorus_replenish_weight: f64,
    pub potassium_replenish_name: String,
    pub potassium_replenish_weight: f64,
    pub nitrogen_basic_name: String,
    pub nitrogen_basic_weight: f64,
    pub phosphorus_basic_name: String,
    pub phosphorus_basic_weight: f64,
    pub potassium_basic_name: String,
    pub potassium_basic_weight: f64,
    pub custom_ratios: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SoilRow> for SoilRecord {
    fn from(row: SoilRow) -> Self {
        let portion = |name: String, weight: f64| FertilizerPortion { name, weight };
        Self {
            id: row.id,
            user_id: row.user_id,
            details: SoilDetails {
                add_number: row.add_number,
                location: row.location,
                crop: row.crop,
                plot_size: row.plot_size,
                average_yield: row.average_yield,
                organic_fertilizer: OrganicFertilizer {
                    name: row.organic_fertilizer_name,
                    amount: row.organic_fertilizer_amount,
                },
                fertilizer_demand: NutrientTriad {
                    n: row.demand_n,
                    p2o5: row.demand_p2o5,
                    k2o: row.demand_k2o,
                },
                total_supply: NutrientTriad {
                    n: row.supply_n,
                    p2o5: row.supply_p2o5,
                    k2o: row.supply_k2o,
                },
                supplement: NutrientTriad {
                    n: row.supplement_n,
                    p2o5: row.supplement_p2o5,
                    k2o: row.supplement_k2o,
                },
                nitrogen_replenish: portion(row.nitrogen_replenish_name, row.nitrogen_replenish_weight),
                phosphorus_replenish: portion(row.phosphorus_replenish_name, row.phosphorus_replenish_weight),
                potassium_replenish: portion(row.potassium_replenish_name, row.potassium_replenish_weight),
                nitrogen_basic: portion(row.nitrogen_basic_name, row.nitrogen_basic_weight),
                phosphorus_basic: portion(row.phosphorus_basic_name, row.phosphorus_basic_weight),
                potassium_basic: portion(row.potassium_basic_name, row.potassium_basic_weight),
                custom_ratios: row.custom_ratios,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
