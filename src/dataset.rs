//! Segment datasets and their GeoJSON encoding.
//!
//! A dataset is written as a GeoJSON `FeatureCollection` of `LineString`
//! features in WGS84 longitude/latitude. The named `crs` member is kept so
//! that readers which still honour it (GDAL, QGIS) agree on the reference
//! system. Attribute names are capped at [`MAX_FIELD_NAME_LEN`] characters
//! so the files convert losslessly to shapefiles.

use geo::{Coord, Line};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{PipelineError, Result};

pub const CRS_NAME: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";

/// Longest attribute name a dBase/shapefile field can carry.
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Per-segment attributes, carried over from the later of the two samples
/// plus the derived kinematic fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAttributes {
    #[serde(rename = "gen_on")]
    pub generated_on: String,
    #[serde(rename = "clctn_date")]
    pub collection_date: Option<String>,
    #[serde(rename = "stand_cap")]
    pub standing_capacity: Option<u32>,
    #[serde(rename = "desc")]
    pub description: Option<String>,
    #[serde(rename = "seat_cap")]
    pub seating_capacity: Option<u32>,
    #[serde(rename = "lst_update")]
    pub last_updated_on: String,
    pub call_name: Option<String>,
    pub speed: Option<f64>,
    pub vehicle_id: String,
    pub segment_id: Option<String>,
    #[serde(rename = "psngr_load")]
    pub passenger_load: Option<f64>,
    pub route_id: Option<String>,
    #[serde(rename = "trk_status")]
    pub tracking_status: Option<String>,
    pub heading: Option<f64>,
    /// Seconds between the two samples.
    pub timedelta: f64,
    /// Geodesic length in statute miles.
    pub length_mi: f64,
    /// Only present in finalized datasets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mph: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub line: Line<f64>,
    pub attributes: SegmentAttributes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub segments: Vec<Segment>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            name: name.into(),
            segments,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

// GeoJSON wire types.

#[derive(Serialize, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    crs: Option<NamedCrs>,
    features: Vec<Feature>,
}

#[derive(Serialize, Deserialize)]
struct NamedCrs {
    #[serde(rename = "type")]
    kind: String,
    properties: CrsProperties,
}

#[derive(Serialize, Deserialize)]
struct CrsProperties {
    name: String,
}

#[derive(Serialize, Deserialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<usize>,
    properties: SegmentAttributes,
    geometry: LineStringGeometry,
}

#[derive(Serialize, Deserialize)]
struct LineStringGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<[f64; 2]>,
}

/// Writes `dataset` to `path`, numbering features from 0.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let collection = FeatureCollection {
        kind: "FeatureCollection".into(),
        name: dataset.name.clone(),
        crs: Some(NamedCrs {
            kind: "name".into(),
            properties: CrsProperties {
                name: CRS_NAME.into(),
            },
        }),
        features: dataset
            .segments
            .iter()
            .enumerate()
            .map(|(id, segment)| Feature {
                kind: "Feature".into(),
                id: Some(id),
                properties: segment.attributes.clone(),
                geometry: LineStringGeometry {
                    kind: "LineString".into(),
                    coordinates: vec![
                        [segment.line.start.x, segment.line.start.y],
                        [segment.line.end.x, segment.line.end.y],
                    ],
                },
            })
            .collect(),
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;
    Ok(())
}

/// Reads a dataset written by [`write_dataset`].
///
/// A missing `crs` member is taken as WGS84; any other CRS is rejected.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let reader = BufReader::new(File::open(path)?);
    let collection: FeatureCollection = serde_json::from_reader(reader)?;

    if let Some(crs) = &collection.crs {
        if crs.properties.name != CRS_NAME {
            return Err(PipelineError::CrsMismatch {
                path: path.to_path_buf(),
                expected: CRS_NAME.into(),
                found: crs.properties.name.clone(),
            });
        }
    }

    let mut segments = Vec::with_capacity(collection.features.len());
    for (idx, feature) in collection.features.into_iter().enumerate() {
        let &[start, end] = feature.geometry.coordinates.as_slice() else {
            return Err(PipelineError::MalformedRow {
                path: path.to_path_buf(),
                line: idx as u64,
                reason: format!(
                    "expected a 2-point LineString, found {} points",
                    feature.geometry.coordinates.len()
                ),
            });
        };
        segments.push(Segment {
            line: Line::new(
                Coord { x: start[0], y: start[1] },
                Coord { x: end[0], y: end[1] },
            ),
            attributes: feature.properties,
        });
    }

    Ok(Dataset::new(collection.name, segments))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn attributes(vehicle_id: &str, timedelta: f64, length_mi: f64) -> SegmentAttributes {
        SegmentAttributes {
            generated_on: "2018-11-01T12:00:33+00:00".into(),
            collection_date: Some("2018-11-01".into()),
            standing_capacity: None,
            description: None,
            seating_capacity: Some(30),
            last_updated_on: "2018-11-01T08:00:31-04:00".into(),
            call_name: Some("2306".into()),
            speed: Some(12.0),
            vehicle_id: vehicle_id.into(),
            segment_id: None,
            passenger_load: None,
            route_id: Some("4005134".into()),
            tracking_status: Some("up".into()),
            heading: Some(90.0),
            timedelta,
            length_mi,
            mph: None,
        }
    }

    pub(crate) fn segment(vehicle_id: &str, timedelta: f64, length_mi: f64) -> Segment {
        Segment {
            line: Line::new(
                Coord { x: -78.9, y: 35.99 },
                Coord { x: -78.899, y: 35.991 },
            ),
            attributes: attributes(vehicle_id, timedelta, length_mi),
        }
    }

    #[test]
    fn test_field_names_fit_shapefile_limit() {
        let mut attrs = attributes("4008242", 30.0, 0.1);
        attrs.mph = Some(12.0);

        let value = serde_json::to_value(&attrs).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();

        assert_eq!(keys.len(), 17);
        for key in keys {
            assert!(key.len() <= MAX_FIELD_NAME_LEN, "{key} is too long");
        }
    }

    #[test]
    fn test_mph_omitted_until_finalized() {
        let value = serde_json::to_value(attributes("1", 30.0, 0.1)).unwrap();
        assert!(value.get("mph").is_none());
        assert_eq!(value["lst_update"], "2018-11-01T08:00:31-04:00");
    }

    #[test]
    fn test_write_then_read_keeps_geometry_and_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("d.geojson");
        let dataset = Dataset::new("d", vec![segment("A", 30.0, 0.1), segment("B", 15.0, 0.05)]);

        write_dataset(&path, &dataset).unwrap();
        let read = read_dataset(&path).unwrap();

        assert_eq!(read.name, "d");
        assert_eq!(read.len(), 2);
        assert_eq!(read.segments[0].attributes.vehicle_id, "A");
        assert_eq!(read.segments[1].attributes.vehicle_id, "B");
        assert!((read.segments[1].line.end.x - -78.899).abs() < 1e-12);
        assert!((read.segments[1].line.end.y - 35.991).abs() < 1e-12);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["features"][1]["id"], 1);
        assert_eq!(raw["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(raw["crs"]["properties"]["name"], CRS_NAME);
    }

    #[test]
    fn test_foreign_crs_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("d.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","crs":{"type":"name","properties":{"name":"EPSG:3857"}},"features":[]}"#,
        )
        .unwrap();

        assert!(matches!(
            read_dataset(&path),
            Err(PipelineError::CrsMismatch { .. })
        ));
    }
}
