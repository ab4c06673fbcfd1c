use csv::{ReaderBuilder, Trim};

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

const ETL_NAME: &str = "csv_import";

/// Picks the field delimiter from the first line. Comma comes last because it
/// doubles as a decimal separator in `;`-separated exports.
pub fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    [b';', b'\t', b'|']
        .into_iter()
        .find(|d| first_line.as_bytes().contains(d))
        .unwrap_or(b',')
}

/// Imports a track given as `latitude,longitude` rows as one closed outline.
pub struct CsvImportEtl {
    projection: TransverseMercator,
    csv_text: String,
    has_header: bool,
}

impl CsvImportEtl {
    pub fn new(origin: ReferenceOrigin, csv_text: impl Into<String>, has_header: bool) -> Self {
        CsvImportEtl {
            projection: TransverseMercator::new(origin),
            csv_text: csv_text.into(),
            has_header,
        }
    }

    /// `line` is the 1-based line of the record in the source text, header
    /// included.
    fn parse_field(record: &csv::StringRecord, index: usize, line: u64) -> Result<f64> {
        let field = record.get(index).ok_or_else(|| {
            Error::InvalidInput(format!("line {} has fewer than two columns", line))
        })?;
        field
            .parse()
            .map_err(|_| Error::InvalidInput(format!("line {}: '{}' is not a number", line, field)))
    }
}

impl Etl for CsvImportEtl {
    type Input = Vec<GeoPoint>;
    type Output = Vec<PlanePoint>;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, progress: &mut Progress) -> Result<Self::Input> {
        progress.report(0, STATUS_PARSING);
        let mut reader = ReaderBuilder::new()
            .has_headers(self.has_header)
            .delimiter(sniff_delimiter(&self.csv_text))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(self.csv_text.as_bytes());

        let mut points = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let line = record
                .position()
                .map_or(i as u64 + 1, |position| position.line());
            points.push(GeoPoint::new(
                Self::parse_field(&record, 0, line)?,
                Self::parse_field(&record, 1, line)?,
            ));
        }
        if points.is_empty() {
            return Err(Error::InvalidInput("CSV content has no points".to_string()));
        }
        Ok(points)
    }

    fn transform(&mut self, input: Self::Input, progress: &mut Progress) -> Result<Self::Output> {
        progress.report(25, STATUS_TRANSFORMING);
        let mut points: Vec<PlanePoint> =
            input.iter().map(|p| self.projection.to_plane(*p)).collect();
        // Close the wire.
        points.push(points[0]);
        Ok(points)
    }

    fn load(
        &mut self,
        scene: &mut dyn Scene,
        output: Self::Output,
        progress: &mut Progress,
    ) -> Result<()> {
        progress.report(50, STATUS_CREATING);
        scene.add_object(
            None,
            SceneObject::Polyline {
                label: "CSV track".to_string(),
                points: output,
                closed: true,
                style: Style {
                    line_color: Some(Color::RED),
                    ..Style::default()
                },
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scene::SceneGraph;

    fn import(text: &str, has_header: bool) -> Result<SceneGraph> {
        let mut scene = SceneGraph::new();
        CsvImportEtl::new(ReferenceOrigin::new(50.0, 11.0), text, has_header)
            .process(&mut scene, &mut Progress::silent())?;
        Ok(scene)
    }

    fn polyline_points(scene: &SceneGraph) -> &[PlanePoint] {
        match &scene.objects[0].object {
            SceneObject::Polyline { points, closed, .. } => {
                assert!(*closed);
                points
            }
            other => panic!("unexpected object {:?}", other),
        }
    }

    #[test]
    fn builds_a_closed_outline() {
        let scene = import("50.0,11.0\n50.1,11.1\n50.0,11.1", false).unwrap();
        let points = polyline_points(&scene);

        assert_eq!(points.len(), 4);
        assert_eq!(points[0], points[3]);
        assert!(points[0].x.abs() < 1e-9 && points[0].y.abs() < 1e-9);
        assert!(points[1].x > 0.0 && points[1].y > 0.0);
    }

    #[test]
    fn header_row_is_skipped() {
        let scene = import("lat;lon\n50,0;11,0\n", true);
        // The decimal comma is not understood, the delimiter is.
        assert!(matches!(scene, Err(Error::InvalidInput(_))));

        let scene = import("lat;lon\n50.0;11.0\n50.01;11.0\n", true).unwrap();
        assert_eq!(polyline_points(&scene).len(), 3);
    }

    #[test]
    fn delimiter_is_sniffed() {
        assert_eq!(sniff_delimiter("50.0,11.0"), b',');
        assert_eq!(sniff_delimiter("\n50.0;11.0"), b';');
        assert_eq!(sniff_delimiter("50.0\t11.0"), b'\t');
    }

    #[test]
    fn bad_rows_and_empty_input_are_rejected() {
        assert!(matches!(import("50.0,abc", false), Err(Error::InvalidInput(_))));
        assert!(matches!(import("50.0", false), Err(Error::InvalidInput(_))));
        assert!(matches!(import("", false), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn errors_name_the_source_line() {
        let message = |result: Result<SceneGraph>| match result {
            Err(Error::InvalidInput(message)) => message,
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        };

        let text = "lat,lon\n50.0,11.0\n50.1,abc\n";
        assert!(message(import(text, true)).contains("line 3"));

        // Blank lines still count.
        let text = "50.0,11.0\n\n50.1\n";
        assert!(message(import(text, false)).contains("line 3"));
    }
}
