//! Sample stream → line segments.
//!
//! All steps are forward passes over an ordered stream that build a fresh
//! output sequence; inputs are never modified in place.

use chrono::{DateTime, FixedOffset};
use geo::{Coord, Line};
use std::ops::AddAssign;

use super::geodesic::{geodesic_miles, offset};
use crate::dataset::{Segment, SegmentAttributes};
use crate::sample::Sample;

/// Segments spanning more than this many seconds are tracking gaps.
pub const MAX_GAP_SECS: f64 = 300.0;

/// A sample with its parsed `last_updated_on`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSample {
    pub sample: Sample,
    pub at: DateTime<FixedOffset>,
}

impl TimedSample {
    pub fn parse(sample: Sample) -> Result<Self, chrono::ParseError> {
        let at = DateTime::parse_from_rfc3339(&sample.last_updated_on)?;
        Ok(Self { sample, at })
    }

    fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.sample.long,
            y: self.sample.lat,
        }
    }
}

/// Counters for what each cleaning step removed or changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub samples: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub perturbed: usize,
    pub stale_gaps: usize,
    pub segments: usize,
}

impl AddAssign for BuildReport {
    fn add_assign(&mut self, rhs: Self) {
        self.samples += rhs.samples;
        self.duplicates += rhs.duplicates;
        self.out_of_order += rhs.out_of_order;
        self.perturbed += rhs.perturbed;
        self.stale_gaps += rhs.stale_gaps;
        self.segments += rhs.segments;
    }
}

/// Exact to the nanosecond; only equal timestamps give zero.
fn elapsed_secs(from: &DateTime<FixedOffset>, to: &DateTime<FixedOffset>) -> f64 {
    let delta = *to - *from;
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => delta.num_seconds() as f64,
    }
}

/// Keeps only samples strictly newer than the last kept one.
///
/// A zero elapsed time is a duplicate transmission; a negative one is a
/// stale report arriving late. Elapsed time is always measured against the
/// retained predecessor, so applying this twice changes nothing.
pub fn retain_advancing(stream: &[TimedSample], report: &mut BuildReport) -> Vec<TimedSample> {
    let mut kept: Vec<TimedSample> = Vec::with_capacity(stream.len());
    for point in stream {
        if let Some(prev) = kept.last() {
            let dt = elapsed_secs(&prev.at, &point.at);
            if dt == 0.0 {
                report.duplicates += 1;
                continue;
            }
            if dt < 0.0 {
                report.out_of_order += 1;
                continue;
            }
        }
        kept.push(point.clone());
    }
    kept
}

/// Offsets every coordinate equal to its (already fixed) predecessor so
/// that no line collapses to a point. Returns the fixed coordinates and the
/// number of points moved.
pub fn fix_coordinates(coords: &[Coord<f64>]) -> (Vec<Coord<f64>>, usize) {
    let mut fixed: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
    let mut perturbed = 0;
    for &c in coords {
        let c = match fixed.last() {
            Some(&prev) if prev == c => {
                perturbed += 1;
                offset(c)
            }
            _ => c,
        };
        fixed.push(c);
    }
    (fixed, perturbed)
}

fn attributes(sample: &Sample, timedelta: f64, length_mi: f64) -> SegmentAttributes {
    SegmentAttributes {
        generated_on: sample.generated_on.clone(),
        collection_date: sample.collection_date.clone(),
        standing_capacity: sample.standing_capacity,
        description: sample.description.clone(),
        seating_capacity: sample.seating_capacity,
        last_updated_on: sample.last_updated_on.clone(),
        call_name: sample.call_name.clone(),
        speed: sample.speed,
        vehicle_id: sample.vehicle_id.clone(),
        segment_id: sample.segment_id.clone(),
        passenger_load: sample.passenger_load,
        route_id: sample.route_id.clone(),
        tracking_status: sample.tracking_status.clone(),
        heading: sample.heading,
        timedelta,
        length_mi,
        mph: None,
    }
}

/// Builds the cleaned segments of one (date, vehicle) stream.
///
/// Streams with fewer than two samples, before or after cleaning, yield no
/// segments.
pub fn build_segments(stream: &[TimedSample]) -> (Vec<Segment>, BuildReport) {
    let mut report = BuildReport {
        samples: stream.len(),
        ..Default::default()
    };
    if stream.len() < 2 {
        return (Vec::new(), report);
    }

    let kept = retain_advancing(stream, &mut report);
    let coords: Vec<_> = kept.iter().map(TimedSample::coord).collect();
    let (fixed, perturbed) = fix_coordinates(&coords);
    report.perturbed = perturbed;

    let mut segments = Vec::with_capacity(kept.len().saturating_sub(1));
    for i in 1..kept.len() {
        let timedelta = elapsed_secs(&kept[i - 1].at, &kept[i].at);
        if timedelta > MAX_GAP_SECS {
            report.stale_gaps += 1;
            continue;
        }
        let line = Line::new(fixed[i - 1], fixed[i]);
        let length_mi = geodesic_miles(line.start, line.end);
        segments.push(Segment {
            line,
            attributes: attributes(&kept[i].sample, timedelta, length_mi),
        });
    }

    report.segments = segments.len();
    (segments, report)
}
