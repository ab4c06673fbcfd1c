use std::sync::{Arc, Mutex};

use geodata_import::{
    config::ImportConfig,
    data::{
        geo::ReferenceOrigin,
        scene::{SceneGraph, SceneObject},
        semantic::Classification,
    },
    elevation::{ElevationClient, ThreadPause},
    errors::FetchError,
    etl::{
        build_geometry::DEFAULT_BUILDING_HEIGHT,
        osm_import::{OsmImportEtl, OsmSource},
        parse_osm,
        semantic_map::SemanticMapper,
        Etl, STATUS_DONE,
    },
    fetch::{HttpResponse, OsmGateway, Transport},
    progress::Progress,
    projection::TransverseMercator,
};

const PAYLOAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <bounds minlat="50.0" minlon="11.0" maxlat="50.01" maxlon="11.01"/>
  <node id="1" lat="50.005" lon="11.005"/>
  <way id="10">
    <nd ref="1"/>
    <tag k="building" v="yes"/>
  </way>
</osm>"#;

/// Serves the same payload to every request and counts them.
struct FixedTransport {
    body: &'static str,
    calls: Mutex<usize>,
}

impl Transport for FixedTransport {
    fn get(&self, _url: &str, _query: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
        *self.calls.lock().unwrap() += 1;
        Ok(HttpResponse {
            status: 200,
            body: self.body.as_bytes().to_vec(),
        })
    }
}

#[test]
fn single_building_is_classified_with_default_height() {
    let data = parse_osm::parse(PAYLOAD.as_bytes()).unwrap();
    let tm = TransverseMercator::new(ReferenceOrigin::new(50.005, 11.005));

    let ways = SemanticMapper::new(&tm, false).map(&data, &mut Progress::silent());

    let buildings: Vec<_> = ways
        .iter()
        .filter(|w| matches!(w.classification, Classification::Building { .. }))
        .collect();
    assert_eq!(buildings.len(), 1);
    assert_eq!(buildings[0].classification, Classification::Building { height: 0.0 });
}

#[test]
fn osm_import_files_one_building() {
    let cache_dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(FixedTransport {
        body: PAYLOAD,
        calls: Mutex::new(0),
    });
    let config = ImportConfig {
        cache_dir: cache_dir.path().to_path_buf(),
        ..ImportConfig::default()
    };
    let gateway = OsmGateway::from_config(&config, transport.clone());
    let elevation = ElevationClient::new(&config, transport.clone(), Box::new(ThreadPause));

    let mut statuses = Vec::new();
    let mut scenes = Vec::new();
    for _ in 0..2 {
        let mut scene = SceneGraph::new();
        let mut progress = Progress::new(|percent, status: &str| {
            statuses.push((percent, status.to_string()))
        });
        OsmImportEtl::new(
            OsmSource::Remote { gateway: &gateway, zoom: 16 },
            &elevation,
            ReferenceOrigin::new(50.005, 11.005),
            false,
            config.render_untagged_ways,
        )
        .process(&mut scene, &mut progress)
        .unwrap();
        scenes.push(scene);
    }

    // The second run is served from the cache.
    assert_eq!(*transport.calls.lock().unwrap(), 1);
    assert_eq!(scenes[0], scenes[1]);

    let buildings = scenes[0].members("buildings");
    assert_eq!(buildings.len(), 1);
    match buildings[0] {
        SceneObject::Extrusion { label, height, .. } => {
            assert_eq!(label, "Building");
            assert_eq!(*height, DEFAULT_BUILDING_HEIGHT);
        }
        other => panic!("unexpected object {:?}", other),
    }
    assert_eq!(statuses.last().unwrap(), &(100, STATUS_DONE.to_string()));
}

#[test]
fn csv_entry_point_builds_closed_outline() {
    let mut scene = SceneGraph::new();
    geodata_import::import_csv(
        50.0,
        11.0,
        "50.0,11.0\n50.1,11.1\n50.0,11.1",
        false,
        &mut scene,
        &mut Progress::silent(),
    )
    .unwrap();

    match &scene.objects[0].object {
        SceneObject::Polyline { points, closed, .. } => {
            assert!(*closed);
            assert_eq!(points.len(), 4);
            assert_eq!(points.first(), points.last());
        }
        other => panic!("unexpected object {:?}", other),
    }
}
