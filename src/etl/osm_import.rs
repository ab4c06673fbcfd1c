use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use log::info;
use xz::bufread::XzDecoder;

use crate::{
    data::{
        geo::ReferenceOrigin,
        osm::Bounds,
        scene::Scene,
        semantic::ClassifiedWay,
    },
    elevation::ElevationClient,
    errors::Result,
    fetch::OsmGateway,
    progress::Progress,
    projection::TransverseMercator,
};

use super::{
    build_geometry::GeometryBuilder, parse_osm, semantic_map::SemanticMapper, Etl, STATUS_CREATING,
    STATUS_PARSING,
};

const ETL_NAME: &str = "osm_import";

/// Where the OSM payload comes from.
pub enum OsmSource<'a> {
    /// The area around the origin, through the cache-backed gateway.
    Remote { gateway: &'a OsmGateway, zoom: u32 },
    /// A local `.osm` file, or `.osm.xz`.
    File(PathBuf),
}

pub struct OsmPayload {
    pub bytes: Vec<u8>,
    pub base_altitude: f64,
}

pub struct OsmImport {
    pub bounds: Bounds,
    pub ways: Vec<ClassifiedWay>,
}

pub struct OsmImportEtl<'a> {
    source: OsmSource<'a>,
    elevation: &'a ElevationClient,
    projection: TransverseMercator,
    download_altitude: bool,
    render_untagged_ways: bool,
}

fn read_osm_file(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if path.extension().and_then(|ext| ext.to_str()) == Some("xz") {
        let file = BufReader::new(File::open(path)?);
        XzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        bytes = fs::read(path)?;
    }
    Ok(bytes)
}

impl<'a> OsmImportEtl<'a> {
    pub fn new(
        source: OsmSource<'a>,
        elevation: &'a ElevationClient,
        origin: ReferenceOrigin,
        download_altitude: bool,
        render_untagged_ways: bool,
    ) -> Self {
        OsmImportEtl {
            source,
            elevation,
            projection: TransverseMercator::new(origin),
            download_altitude,
            render_untagged_ways,
        }
    }
}

impl Etl for OsmImportEtl<'_> {
    type Input = OsmPayload;
    type Output = OsmImport;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, progress: &mut Progress) -> Result<Self::Input> {
        let origin = self.projection.origin();
        let bytes = match &self.source {
            OsmSource::Remote { gateway, zoom } => {
                progress.report(0, "Downloading data from openstreetmap.org ...");
                gateway.fetch(origin.point(), *zoom)?
            }
            OsmSource::File(path) => {
                progress.report(0, "Reading OSM file ...");
                read_osm_file(path)?
            }
        };

        let base_altitude = if self.download_altitude {
            progress.report(0, "Downloading altitude ...");
            self.elevation.get_altitude(origin.point())
        } else {
            0.0
        };
        Ok(OsmPayload { bytes, base_altitude })
    }

    fn transform(&mut self, input: Self::Input, progress: &mut Progress) -> Result<Self::Output> {
        progress.report(0, STATUS_PARSING);
        let data = parse_osm::parse(&input.bytes)?;
        info!(nodes = data.nodes.len(), ways = data.ways.len(); "Parsed OSM data");

        let mut mapper = SemanticMapper::new(&self.projection, self.render_untagged_ways);
        if self.download_altitude {
            mapper = mapper.with_elevation(self.elevation, input.base_altitude);
        }
        let ways = mapper.map(&data, progress);
        Ok(OsmImport {
            bounds: data.bounds,
            ways,
        })
    }

    fn load(
        &mut self,
        scene: &mut dyn Scene,
        output: Self::Output,
        progress: &mut Progress,
    ) -> Result<()> {
        let mut builder = GeometryBuilder::new(scene);
        builder.add_area(&output.bounds, &self.projection);

        let way_count = output.ways.len();
        for (i, way) in output.ways.iter().enumerate() {
            progress.report_step(50, 100, i, way_count, STATUS_CREATING);
            builder.add_way(way);
        }
        Ok(())
    }
}
