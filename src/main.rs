use std::env;
use std::fs::{create_dir_all, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use structured_logger::json::new_writer;
use structured_logger::Builder;

use geodata_import::config::{load_run_config, ImportJob, RunConfig};
use geodata_import::connectivity::{ConnectionChecker, ConnectivityOutcome};
use geodata_import::data::scene::SceneGraph;
use geodata_import::errors::{Error, FetchError, Result};
use geodata_import::fetch::{ReqwestTransport, Transport};
use geodata_import::progress::Progress;

const DEFAULT_CONFIG_PATH: &str = "config/import.json";

fn setup_logging() {
    Builder::with_level("info")
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn check_connection(config: &RunConfig) -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.import)?);
    let url = config.import.connectivity_check_url.clone();
    match ConnectionChecker::spawn(transport, url).wait() {
        ConnectivityOutcome::Success => Ok(()),
        ConnectivityOutcome::Failure(message) => Err(FetchError::Unavailable(message).into()),
    }
}

fn run_job(config: &RunConfig, scene: &mut SceneGraph) -> Result<()> {
    let mut progress = Progress::new(|percent, status: &str| {
        info!(percent = percent, status = status; "Import progress");
    });
    let import = &config.import;
    match &config.job {
        ImportJob::Osm {
            latitude,
            longitude,
            zoom,
            download_altitude,
        } => geodata_import::import_osm(
            import,
            *latitude,
            *longitude,
            *zoom,
            *download_altitude,
            scene,
            &mut progress,
        ),
        ImportJob::OsmFile {
            latitude,
            longitude,
            path,
            download_altitude,
        } => geodata_import::import_osm_file(
            import,
            *latitude,
            *longitude,
            path,
            *download_altitude,
            scene,
            &mut progress,
        ),
        ImportJob::Csv {
            latitude,
            longitude,
            path,
            has_header,
        } => {
            let text = std::fs::read_to_string(path)?;
            let (lat, lon) = (*latitude, *longitude);
            geodata_import::import_csv(lat, lon, &text, *has_header, scene, &mut progress)
        }
        ImportJob::Gpx {
            latitude,
            longitude,
            altitude_offset,
            path,
        } => {
            let (lat, lon) = (*latitude, *longitude);
            geodata_import::import_gpx(lat, lon, *altitude_offset, path, scene, &mut progress)
        }
        ImportJob::Emir { path } => geodata_import::import_emir(path, scene, &mut progress),
    }
}

fn write_scene(output_dir: &Path, scene: &SceneGraph) -> Result<PathBuf> {
    create_dir_all(output_dir)?;
    let bytes = rkyv::to_bytes::<_, 256>(scene)
        .map_err(|err| Error::InvalidInput(format!("could not serialize scene: {}", err)))?;
    let output_path = output_dir.join("scene.rkyv");
    let mut file = File::create(&output_path)?;
    file.write_all(&bytes)?;
    Ok(output_path)
}

fn run(config_path: &Path) -> Result<()> {
    let config = load_run_config(config_path)?;
    if config.job.needs_network() {
        check_connection(&config)?;
    }

    let mut scene = SceneGraph::new();
    run_job(&config, &mut scene)?;

    let output_path = write_scene(&config.output_dir, &scene)?;
    info!(
        path = output_path.display().to_string().as_str(),
        groups = scene.groups.len(),
        objects = scene.objects.len();
        "Wrote scene"
    );
    Ok(())
}

fn main() -> Result<()> {
    setup_logging();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    if let Err(err) = run(&config_path) {
        error!(err = err.to_string().as_str(); "Import failed");
        return Err(err);
    }
    Ok(())
}
