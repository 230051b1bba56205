//! The flat-file sample row shared by the collector, partitioner and
//! segment builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::VehicleRecord;

/// Marker written into every field of a sentinel row except the timestamp.
pub const NO_DATA: &str = "NoData";

/// Flat-file columns in write order.
pub const COLUMNS: [&str; 15] = [
    "generated_on",
    "standing_capacity",
    "description",
    "seating_capacity",
    "last_updated_on",
    "call_name",
    "speed",
    "vehicle_id",
    "segment_id",
    "passenger_load",
    "route_id",
    "tracking_status",
    "lat",
    "long",
    "heading",
];

/// Column inserted by the partitioner right after `generated_on`.
pub const COLLECTION_DATE: &str = "collection_date";

/// One observation of one vehicle.
///
/// Field order matches [`COLUMNS`]; `collection_date` only exists in
/// partitioned files and is never written by the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub generated_on: String,
    #[serde(default, skip_serializing)]
    pub collection_date: Option<String>,
    pub standing_capacity: Option<u32>,
    pub description: Option<String>,
    pub seating_capacity: Option<u32>,
    pub last_updated_on: String,
    pub call_name: Option<String>,
    pub speed: Option<f64>,
    pub vehicle_id: String,
    pub segment_id: Option<String>,
    pub passenger_load: Option<f64>,
    pub route_id: Option<String>,
    pub tracking_status: Option<String>,
    pub lat: f64,
    pub long: f64,
    pub heading: Option<f64>,
}

impl Sample {
    pub fn from_vehicle(generated_on: &str, v: &VehicleRecord) -> Self {
        Sample {
            generated_on: generated_on.to_string(),
            collection_date: None,
            standing_capacity: v.standing_capacity,
            description: v.description.clone(),
            seating_capacity: v.seating_capacity,
            last_updated_on: v.last_updated_on.clone(),
            call_name: v.call_name.clone(),
            speed: v.speed,
            vehicle_id: v.vehicle_id.clone(),
            segment_id: v.segment_id.clone(),
            passenger_load: v.passenger_load,
            route_id: v.route_id.clone(),
            tracking_status: v.tracking_status.clone(),
            lat: v.location.lat,
            long: v.location.lng,
            heading: v.heading,
        }
    }

    /// Calendar date key: the first 10 characters of `generated_on`.
    pub fn date_key(generated_on: &str) -> Option<&str> {
        generated_on.get(..10)
    }
}

/// Sentinel row for a failed poll: the error time followed by `NoData`.
pub fn sentinel_row(at: DateTime<Utc>) -> Vec<String> {
    let mut row = Vec::with_capacity(COLUMNS.len());
    row.push(at.format("%Y-%m-%dT%H:%M:%S+00:00").to_string());
    row.extend(std::iter::repeat_n(NO_DATA.to_string(), COLUMNS.len() - 1));
    row
}

/// True if a raw row (of strings) is a sentinel row.
pub fn is_sentinel<'a>(fields: impl IntoIterator<Item = &'a str>) -> bool {
    fields.into_iter().skip(1).all(|f| f == NO_DATA)
}
