//! Imports geographic data (OSM maps, CSV and GPX tracks, EMIR terrain grids)
//! into a 3D scene, projected onto a local metric plane.

pub mod config;
pub mod connectivity;
pub mod data;
pub mod elevation;
pub mod errors;
pub mod etl;
pub mod fetch;
pub mod progress;
pub mod projection;

use std::{path::Path, sync::Arc};

use crate::{
    config::ImportConfig,
    data::{geo::ReferenceOrigin, scene::Scene},
    elevation::{ElevationClient, ThreadPause},
    errors::Result,
    etl::{
        csv_import::CsvImportEtl,
        emir_import::EmirImportEtl,
        gpx_import::GpxImportEtl,
        osm_import::{OsmImportEtl, OsmSource},
        Etl,
    },
    fetch::{OsmGateway, ReqwestTransport, Transport},
    progress::Progress,
};

fn network(config: &ImportConfig) -> Result<(Arc<dyn Transport>, ElevationClient)> {
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config)?);
    let elevation = ElevationClient::new(config, transport.clone(), Box::new(ThreadPause));
    Ok((transport, elevation))
}

/// Downloads the area around the origin (or reads it from the cache) and
/// builds highways, landuses and buildings.
pub fn import_osm(
    config: &ImportConfig,
    latitude: f64,
    longitude: f64,
    zoom: u32,
    download_altitude: bool,
    scene: &mut dyn Scene,
    progress: &mut Progress,
) -> Result<()> {
    let (transport, elevation) = network(config)?;
    let gateway = OsmGateway::from_config(config, transport);
    OsmImportEtl::new(
        OsmSource::Remote { gateway: &gateway, zoom },
        &elevation,
        ReferenceOrigin::new(latitude, longitude),
        download_altitude,
        config.render_untagged_ways,
    )
    .process(scene, progress)
}

/// Same as [`import_osm`] for a local `.osm` or `.osm.xz` file.
pub fn import_osm_file(
    config: &ImportConfig,
    latitude: f64,
    longitude: f64,
    path: &Path,
    download_altitude: bool,
    scene: &mut dyn Scene,
    progress: &mut Progress,
) -> Result<()> {
    let (_, elevation) = network(config)?;
    OsmImportEtl::new(
        OsmSource::File(path.to_path_buf()),
        &elevation,
        ReferenceOrigin::new(latitude, longitude),
        download_altitude,
        config.render_untagged_ways,
    )
    .process(scene, progress)
}

pub fn import_csv(
    latitude: f64,
    longitude: f64,
    csv_text: &str,
    has_header: bool,
    scene: &mut dyn Scene,
    progress: &mut Progress,
) -> Result<()> {
    let origin = ReferenceOrigin::new(latitude, longitude);
    CsvImportEtl::new(origin, csv_text, has_header).process(scene, progress)
}

pub fn import_gpx(
    latitude: f64,
    longitude: f64,
    altitude_offset: f64,
    path: &Path,
    scene: &mut dyn Scene,
    progress: &mut Progress,
) -> Result<()> {
    let origin = ReferenceOrigin::new(latitude, longitude);
    GpxImportEtl::new(origin, altitude_offset, path).process(scene, progress)
}

pub fn import_emir(path: &Path, scene: &mut dyn Scene, progress: &mut Progress) -> Result<()> {
    EmirImportEtl::new(path).process(scene, progress)
}
