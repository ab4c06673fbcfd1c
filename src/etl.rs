pub mod build_geometry;
pub mod csv_import;
pub mod emir_import;
pub mod gpx_import;
pub mod osm_import;
pub mod parse_osm;
pub mod semantic_map;

use log::{error, info};

use crate::{data::scene::Scene, errors::{Error, Result}, progress::Progress};

pub const STATUS_PARSING: &str = "Parsing data ...";
pub const STATUS_TRANSFORMING: &str = "Transforming data ...";
pub const STATUS_CREATING: &str = "Creating visualizations ...";
pub const STATUS_DONE: &str = "Successfully imported data.";

/// One import, split in three stages: `extract` acquires the raw input,
/// `transform` turns it into planar geometry, `load` writes it into the scene.
pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn extract(&mut self, progress: &mut Progress) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input, progress: &mut Progress) -> Result<Self::Output>;
    fn load(
        &mut self,
        scene: &mut dyn Scene,
        output: Self::Output,
        progress: &mut Progress,
    ) -> Result<()>;

    /// Logs the failed stage and hands the user-facing message to the host.
    fn report_failure(&self, stage: &str, err: Error, progress: &mut Progress) -> Error {
        error!(
            etl_name = self.etl_name(),
            stage = stage,
            err = err.to_string().as_str();
            "Stage failed with error"
        );
        progress.report(0, &err.status_message());
        err
    }

    fn process(&mut self, scene: &mut dyn Scene, progress: &mut Progress) -> Result<()> {
        info!(etl_name = self.etl_name(); "Starting ETL process");

        info!(etl_name = self.etl_name(); "Extracting");
        let input = match self.extract(progress) {
            Ok(input) => input,
            Err(err) => return Err(self.report_failure("extract", err, progress)),
        };

        info!(etl_name = self.etl_name(); "Transforming");
        let output = match self.transform(input, progress) {
            Ok(output) => output,
            Err(err) => return Err(self.report_failure("transform", err, progress)),
        };

        info!(etl_name = self.etl_name(); "Loading");
        if let Err(err) = self.load(scene, output, progress) {
            return Err(self.report_failure("load", err, progress));
        }

        progress.report(100, STATUS_DONE);
        info!(etl_name = self.etl_name(); "Process finished");
        Ok(())
    }
}
