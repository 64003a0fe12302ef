use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoisturePoint {
    pub value: f64,
}

/// One irrigated plot within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationArea {
    #[serde(default)]
    pub plot_size: f64,
    #[serde(default)]
    pub water_flow_rate: f64,
    #[serde(default)]
    pub tank_size: f64,
    #[serde(default)]
    pub tank_size_name: String,
    #[serde(default)]
    pub water_amount: f64,
    #[serde(default)]
    pub irrigation_time: String,
    #[serde(default)]
    pub fertilizer_start_time: String,
    #[serde(default)]
    pub fertilizer_total_time: String,
    #[serde(default)]
    pub fertilizer_flow_rate: f64,
    #[serde(default)]
    pub moisture_points: Vec<MoisturePoint>,
    #[serde(default)]
    pub negative: bool,
}

/// Body of `POST /irrigation/save` and `PUT /irrigation/record`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationInput {
    #[serde(default)]
    pub irrigation_mode: String,
    #[serde(default)]
    pub efficiency: f64,
    #[serde(default)]
    pub crop_type: String,
    #[serde(default)]
    pub depth: f64,
    #[serde(default)]
    pub optimal_moisture: f64,
    #[serde(default)]
    pub soil_type: String,
    #[serde(default)]
    pub field_capacity: f64,
    #[serde(default)]
    pub soil_density: f64,
    #[serde(default)]
    pub areas: Vec<IrrigationArea>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationRecord {
    pub id: i64,
    pub user_id: i64,
    pub irrigation_mode: String,
    pub efficiency: f64,
    pub crop_type: String,
    pub depth: f64,
    pub optimal_moisture: f64,
    pub soil_type: String,
    pub field_capacity: f64,
    pub soil_density: f64,
    pub areas: Vec<IrrigationArea>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct IrrigationRow {
    pub id: i64,
    pub user_id: i64,
    pub irrigation_mode: String,
    pub efficiency: f64,
    pub crop_type: String,
    pub depth: f64,
    pub optimal_moisture: f64,
    pub soil_type: String,
    pub field_capacity: f64,
    pub soil_density: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct IrrigationAreaRow {
    pub record_id: i64,
    pub plot_size: f64,
    pub water_flow_rate: f64,
    pub tank_size: f64,
    pub tank_size_name: String,
    pub water_amount: f64,
    pub irrigation_time: String,
    pub fertilizer_start_time: String,
    pub fertilizer_total_time: String,
    pub fertilizer_flow_rate: f64,
    pub moisture_points: Json<Vec<MoisturePoint>>,
    pub negative: bool,
}

impl From<IrrigationAreaRow> for IrrigationArea {
    fn from(row: IrrigationAreaRow) -> Self {
        Self {
            plot_size: row.plot_size,
            water_flow_rate: row.water_flow_rate,
            tank_size: row.tank_size,
            tank_size_name: row.tank_size_name,
            water_amount: row.water_amount,
            irrigation_time: row.irrigation_time,
            fertilizer_start_time: row.fertilizer_start_time,
            fertilizer_total_time: row.fertilizer_total_time,
            fertilizer_flow_rate: row.fertilizer_flow_rate,
            moisture_points: row.moisture_points.0,
            negative: row.negative,
        }
    }
}

impl IrrigationRecord {
    pub fn assemble(parent: IrrigationRow, areas: impl IntoIterator<Item = IrrigationAreaRow>) -> Self {
        let areas = areas
            .into_iter()
            .filter(|a| a.record_id == parent.id)
            .map(IrrigationArea::from)
            .collect();

        Self {
            id: parent.id,
            user_id: parent.user_id,
            irrigation_mode: parent.irrigation_mode,
            efficiency: parent.efficiency,
            crop_type: parent.crop_type,
            depth: parent.depth,
            optimal_moisture: parent.optimal_moisture,
            soil_type: parent.soil_type,
            field_capacity: parent.field_capacity,
            soil_density: parent.soil_density,
            areas,
            created_at: parent.created_at,
            updated_at: parent.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn area_defaults_missing_fields_and_ignores_extras() {
        let area: IrrigationArea = serde_json::from_value(json!({
            "areaId": 3,
            "plotSize": 1.5,
            "moisturePoints": [{"value": 0.21}, {"value": 0.24}],
            "negative": true
        }))
        .unwrap();

        assert_eq!(area.plot_size, 1.5);
        assert_eq!(area.moisture_points.len(), 2);
        assert!(area.negative);
        assert_eq!(area.tank_size_name, "");
    }

    #[test]
    fn assemble_keeps_only_own_areas_in_order() {
        let now = Utc::now();
        let parent = IrrigationRow {
            id: 1,
            user_id: 9,
            irrigation_mode: "drip".into(),
            efficiency: 0.9,
            crop_type: "wheat".into(),
            depth: 30.0,
            optimal_moisture: 0.7,
            soil_type: "loam".into(),
            field_capacity: 0.3,
            soil_density: 1.3,
            created_at: now,
            updated_at: now,
        };
        let area = |record_id: i64, plot_size: f64| IrrigationAreaRow {
            record_id,
            plot_size,
            water_flow_rate: 2.0,
            tank_size: 100.0,
            tank_size_name: "small".into(),
            water_amount: 12.0,
            irrigation_time: "10".into(),
            fertilizer_start_time: "2".into(),
            fertilizer_total_time: "6".into(),
            fertilizer_flow_rate: 1.0,
            moisture_points: Json(vec![MoisturePoint { value: 0.2 }]),
            negative: false,
        };

        let record = IrrigationRecord::assemble(parent, vec![area(1, 1.0), area(2, 5.0), area(1, 3.0)]);
        assert_eq!(record.areas.len(), 2);
        assert_eq!(record.areas[1].plot_size, 3.0);
        assert_eq!(record.areas[0].moisture_points, vec![MoisturePoint { value: 0.2 }]);
    }
}
