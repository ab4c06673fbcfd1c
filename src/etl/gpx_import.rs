use std::{fs::File, io::BufReader, path::PathBuf};

use log::info;

use crate::{
    data::{
        geo::{GeoPoint, PlanePoint, ReferenceOrigin},
        scene::{Color, Scene, SceneObject, Style},
    },
    errors::{Error, Result},
    progress::Progress,
    projection::TransverseMercator,
};

use super::{Etl, STATUS_CREATING, STATUS_PARSING, STATUS_TRANSFORMING};

const ETL_NAME: &str = "gpx_import";
pub const GPX_GROUP: &str = "gpx";
const DEFAULT_TRACK_LABEL: &str = "GPX track";

pub struct TrackSegment {
    pub label: String,
    pub points: Vec<PlanePoint>,
}

/// Imports every track segment of a GPX file as an open polyline, lifted by
/// a constant altitude offset.
pub struct GpxImportEtl {
    projection: TransverseMercator,
    altitude_offset: f64,
    path: PathBuf,
}

impl GpxImportEtl {
    pub fn new(origin: ReferenceOrigin, altitude_offset: f64, path: impl Into<PathBuf>) -> Self {
        GpxImportEtl {
            projection: TransverseMercator::new(origin),
            altitude_offset,
            path: path.into(),
        }
    }
}

impl Etl for GpxImportEtl {
    type Input = gpx::Gpx;
    type Output = Vec<TrackSegment>;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, progress: &mut Progress) -> Result<Self::Input> {
        progress.report(0, STATUS_PARSING);
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(gpx::read(reader)?)
    }

    fn transform(&mut self, input: Self::Input, progress: &mut Progress) -> Result<Self::Output> {
        progress.report(25, STATUS_TRANSFORMING);
        let mut segments = Vec::new();
        for track in &input.tracks {
            let label = track
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_TRACK_LABEL.to_string());
            for segment in &track.segments {
                let points: Vec<PlanePoint> = segment
                    .points
                    .iter()
                    .map(|waypoint| {
                        let position = waypoint.point();
                        let geo = GeoPoint::new(position.y(), position.x());
                        let mut point = self.projection.to_plane(geo);
                        point.z = waypoint.elevation.unwrap_or(0.0) + self.altitude_offset;
                        point
                    })
                    .collect();
                if !points.is_empty() {
                    segments.push(TrackSegment {
                        label: label.clone(),
                        points,
                    });
                }
            }
        }

        if segments.is_empty() {
            return Err(Error::InvalidInput(format!("{} has no track points", self.path.display())));
        }
        info!(tracks = input.tracks.len(), segments = segments.len(); "Read GPX tracks");
        Ok(segments)
    }

    fn load(
        &mut self,
        scene: &mut dyn Scene,
        output: Self::Output,
        progress: &mut Progress,
    ) -> Result<()> {
        progress.report(50, STATUS_CREATING);
        let group = scene.add_group(GPX_GROUP);
        for segment in output {
            scene.add_object(
                Some(group),
                SceneObject::Polyline {
                    label: segment.label,
                    points: segment.points,
                    closed: false,
                    style: Style {
                        line_color: Some(Color::RED),
                        ..Style::default()
                    },
                },
            );
        }
        Ok(())
    }
}
