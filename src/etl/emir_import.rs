use std::{collections::HashMap, fs, path::PathBuf};

use log::{info, warn};

use crate::{
    data::{
        geo::PlanePoint,
        scene::{Scene, SceneObject, Style},
    },
    errors::{Error, Result},
    progress::Progress,
};

use super::{Etl, STATUS_CREATING, STATUS_PARSING, STATUS_TRANSFORMING};

const ETL_NAME: &str = "emir_import";
pub const EMIR_GROUP: &str = "emir";

/// Header of an ESRI-style ASCII grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridHeader {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub header: GridHeader,
    /// Row-major, first row is the northernmost.
    pub values: Vec<f64>,
}

impl Grid {
    fn value(&self, row: usize, col: usize) -> Option<f64> {
        let value = self.values[row * self.header.ncols + col];
        match self.header.nodata_value {
            Some(nodata) if value == nodata => None,
            _ => Some(value),
        }
    }

    /// Planar point of a cell, `None` for nodata cells.
    pub fn point(&self, row: usize, col: usize) -> Option<PlanePoint> {
        let h = &self.header;
        self.value(row, col).map(|z| {
            PlanePoint::new(
                h.xllcorner + col as f64 * h.cellsize,
                h.yllcorner + (h.nrows - 1 - row) as f64 * h.cellsize,
                z,
            )
        })
    }
}

fn header_field<T: std::str::FromStr>(fields: &HashMap<String, String>, key: &str) -> Result<T> {
    let raw = fields
        .get(key)
        .ok_or_else(|| Error::Grid(format!("header lacks {}", key)))?;
    raw.parse()
        .map_err(|_| Error::Grid(format!("header field {} has invalid value '{}'", key, raw)))
}

/// Parses the header lines, then reads the values as one whitespace separated
/// stream so that wrapped rows are accepted.
pub fn parse_grid(text: &str) -> Result<Grid> {
    let mut fields = HashMap::new();
    let mut body_start = text.len();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some(key) if key.starts_with(|c: char| c.is_ascii_alphabetic()) => {
                let value = tokens
                    .next()
                    .ok_or_else(|| Error::Grid(format!("header field {} has no value", key)))?;
                fields.insert(key.to_ascii_lowercase(), value.to_string());
            }
            Some(_) => {
                body_start = offset;
                break;
            }
            None => (),
        }
        offset += line.len();
    }

    let header = GridHeader {
        ncols: header_field(&fields, "ncols")?,
        nrows: header_field(&fields, "nrows")?,
        xllcorner: header_field(&fields, "xllcorner")?,
        yllcorner: header_field(&fields, "yllcorner")?,
        cellsize: header_field(&fields, "cellsize")?,
        nodata_value: if fields.contains_key("nodata_value") {
            Some(header_field(&fields, "nodata_value")?)
        } else {
            None
        },
    };
    if header.ncols == 0 || header.nrows == 0 {
        return Err(Error::Grid("grid has no cells".to_string()));
    }

    let expected = header.ncols.checked_mul(header.nrows).ok_or_else(|| {
        Error::Grid(format!("{}x{} grid is too large", header.nrows, header.ncols))
    })?;
    let values = text[body_start..]
        .split_whitespace()
        .take(expected)
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| Error::Grid(format!("invalid cell value '{}'", token)))
        })
        .collect::<Result<Vec<f64>>>()?;
    if values.len() < expected {
        return Err(Error::Grid(format!(
            "expected {} values for a {}x{} grid, found {}",
            expected,
            header.nrows,
            header.ncols,
            values.len()
        )));
    }
    Ok(Grid { header, values })
}

/// Imports an EMIR terrain grid as a net of B-splines, one per row and one
/// per column.
pub struct EmirImportEtl {
    path: PathBuf,
}

impl EmirImportEtl {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EmirImportEtl { path: path.into() }
    }
}

pub struct SplineNet {
    pub rows: Vec<Vec<PlanePoint>>,
    pub cols: Vec<Vec<PlanePoint>>,
}

impl Etl for EmirImportEtl {
    type Input = Grid;
    type Output = SplineNet;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, progress: &mut Progress) -> Result<Self::Input> {
        progress.report(0, STATUS_PARSING);
        let text = fs::read_to_string(&self.path)?;
        let grid = parse_grid(&text)?;
        info!(nrows = grid.header.nrows, ncols = grid.header.ncols; "Read EMIR grid");
        Ok(grid)
    }

    fn transform(&mut self, input: Self::Input, progress: &mut Progress) -> Result<Self::Output> {
        progress.report(25, STATUS_TRANSFORMING);
        let (nrows, ncols) = (input.header.nrows, input.header.ncols);
        let rows = (0..nrows)
            .map(|r| (0..ncols).filter_map(|c| input.point(r, c)).collect())
            .collect();
        let cols = (0..ncols)
            .map(|c| (0..nrows).filter_map(|r| input.point(r, c)).collect())
            .collect();
        Ok(SplineNet { rows, cols })
    }

    fn load(
        &mut self,
        scene: &mut dyn Scene,
        output: Self::Output,
        progress: &mut Progress,
    ) -> Result<()> {
        progress.report(50, STATUS_CREATING);
        let group = scene.add_group(EMIR_GROUP);
        let labelled = output
            .rows
            .into_iter()
            .enumerate()
            .map(|(i, points)| (format!("row_{}", i), points))
            .chain(
                output
                    .cols
                    .into_iter()
                    .enumerate()
                    .map(|(j, points)| (format!("col_{}", j), points)),
            );
        for (label, points) in labelled {
            if points.len() < 2 {
                warn!(
                    spline = label.as_str(),
                    points = points.len();
                    "Skipping spline with too few points"
                );
                continue;
            }
            scene.add_object(
                Some(group),
                SceneObject::BSpline {
                    label,
                    points,
                    style: Style::default(),
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scene::SceneGraph;

    const GRID: &str = "ncols        3
nrows        2
xllcorner    260.0
yllcorner    120.0
cellsize     10.0
10 11 12
20 21 22
";

    #[test]
    fn first_row_is_northernmost() {
        let grid = parse_grid(GRID).unwrap();
        assert_eq!(grid.header.nodata_value, None);
        assert_eq!(grid.point(0, 0), Some(PlanePoint::new(260.0, 130.0, 10.0)));
        assert_eq!(grid.point(1, 2), Some(PlanePoint::new(280.0, 120.0, 22.0)));
    }

    #[test]
    fn header_is_case_insensitive_and_rows_may_wrap() {
        let text = "NCOLS 2\nNROWS 2\nXLLCORNER 0\nYLLCORNER 0\nCellSize 1\n\
                    NODATA_value -9999\n1 2 3\n4\n";
        let grid = parse_grid(text).unwrap();
        assert_eq!(grid.values, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.header.nodata_value, Some(-9999.0));
    }

    fn assert_grid_error(text: &str) {
        assert!(matches!(parse_grid(text), Err(Error::Grid(_))), "accepted {:?}", text);
    }

    #[test]
    fn short_or_broken_grids_are_rejected() {
        assert_grid_error("ncols 3\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n");
        assert_grid_error("ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\n5\n");
        assert_grid_error("ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\nx\n");
    }

    #[test]
    fn oversized_header_is_rejected() {
        let huge = usize::MAX / 2 + 1;
        assert_grid_error(&format!(
            "ncols {}\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n",
            huge
        ));
        assert_grid_error(
            "ncols 4294967296\nnrows 4294967296\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n",
        );
    }

    #[test]
    fn builds_one_spline_per_row_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.dat");
        fs::write(&path, GRID).unwrap();
        let mut scene = SceneGraph::new();

        EmirImportEtl::new(path).process(&mut scene, &mut Progress::silent()).unwrap();

        let splines = scene.members("emir");
        assert_eq!(splines.len(), 5);
        let labels: Vec<&str> = splines.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["row_0", "row_1", "col_0", "col_1", "col_2"]);
        match splines[2] {
            SceneObject::BSpline { points, .. } => {
                let expected = vec![
                    PlanePoint::new(260.0, 130.0, 10.0),
                    PlanePoint::new(260.0, 120.0, 20.0),
                ];
                assert_eq!(points, &expected);
            }
            other => panic!("unexpected object {:?}", other),
        }
    }

    #[test]
    fn nodata_cells_are_left_out() {
        let text = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n\
                    nodata_value -1\n-1 5\n6 7\n";
        let grid = parse_grid(text).unwrap();
        assert_eq!(grid.point(0, 0), None);

        let mut scene = SceneGraph::new();
        let mut etl = EmirImportEtl::new("unused");
        let net = etl.transform(grid, &mut Progress::silent()).unwrap();
        etl.load(&mut scene, net, &mut Progress::silent()).unwrap();

        // row_0 and col_0 keep a single point and are dropped.
        let labels: Vec<&str> = scene.members("emir").iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["row_1", "col_1"]);
    }
}
