use crate::adapters::codec::TextRasterCodec;
use crate::app::postprocessors;
use crate::app::report::{self, ImpactSummary, Provenance};
use crate::core::engine::ImpactEngine;
use crate::core::{ConfigProvider, ExtendedResult, ImpactInputs, Pipeline, RasterCodec, Storage};
use crate::domain::metadata::ImpactFunctionConfig;
use crate::domain::model::{HazardRaster, PopulationRaster, ThresholdSet};
use crate::utils::error::Result;
use std::io::Write;
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const OUTPUT_ARCHIVE: &str = "impact_output.zip";

/// Reads both rasters through `Storage`, runs the engine and writes a zip
/// bundle next to the configured output path.
pub struct FilePipeline<S: Storage, C: ConfigProvider, K: RasterCodec = TextRasterCodec> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) codec: K,
}

impl<S: Storage, C: ConfigProvider> FilePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self::with_codec(storage, config, TextRasterCodec)
    }
}

impl<S: Storage, C: ConfigProvider, K: RasterCodec> FilePipeline<S, C, K> {
    pub fn with_codec(storage: S, config: C, codec: K) -> Self {
        Self {
            storage,
            config,
            codec,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    async fn read_raster(&self, path: &str) -> Result<crate::domain::model::Raster> {
        let bytes = self.storage.read_file(path).await?;
        let format = TextRasterCodec::format_of(path);
        tracing::debug!("Decoding {} ({} bytes, format '{}')", path, bytes.len(), format);
        self.codec.decode(path, &format, &bytes)
    }

    fn function_config(&self) -> Result<ImpactFunctionConfig> {
        let thresholds = ThresholdSet::new(self.config.thresholds().to_vec())?;
        Ok(
            ImpactFunctionConfig::new(thresholds, self.config.needs_profile().clone())
                .with_workers(self.config.worker_threads())
                .with_tile_rows(self.config.tile_rows()),
        )
    }

    fn archive_path(&self) -> String {
        Path::new(self.config.output_path())
            .join(OUTPUT_ARCHIVE)
            .to_string_lossy()
            .into_owned()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, K: RasterCodec> Pipeline for FilePipeline<S, C, K> {
    async fn extract(&self) -> Result<ImpactInputs> {
        let hazard = self.read_raster(self.config.hazard_path()).await?;
        let hazard = HazardRaster::with_unit_label(hazard, self.config.hazard_unit())?;

        let population = self.read_raster(self.config.population_path()).await?;
        let population = PopulationRaster::new(population)?;

        Ok(ImpactInputs { hazard, population })
    }

    async fn transform(&self, inputs: ImpactInputs) -> Result<ExtendedResult> {
        let function_config = self.function_config()?;
        let settings = self.config.postprocessors().clone();

        // 計算為 CPU 密集工作，移到 blocking 執行緒避免卡住 runtime
        tokio::task::spawn_blocking(move || {
            let postprocessors = postprocessors::from_settings(&settings)?;
            ImpactEngine::new(function_config).compute_extended(
                &inputs.hazard,
                &inputs.population,
                &postprocessors,
            )
        })
        .await?
    }

    async fn load(&self, result: ExtendedResult) -> Result<String> {
        let output_path = self.archive_path();
        let format = self.config.raster_format();

        let provenance = Provenance::now(
            self.config.hazard_path(),
            self.config.hazard_unit(),
            self.config.population_path(),
            &self.config.needs_profile().name,
        );
        let summary = ImpactSummary::new(self.config.analysis_name(), &result, provenance);
        let post_csv = report::postprocessing_csv(&result.postprocessing)?;

        tracing::debug!(
            "Creating ZIP file with {} files",
            4 + usize::from(post_csv.is_some())
        );

        // 建立 ZIP 檔
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            // 受影響人口網格
            zip.start_file(format!("affected_population.{}", format), SimpleFileOptions::default())?;
            zip.write_all(&self.codec.encode(&result.result.affected, format)?)?;

            zip.start_file("breakdown.csv", SimpleFileOptions::default())?;
            zip.write_all(&report::breakdown_csv(&result)?)?;

            zip.start_file("needs.csv", SimpleFileOptions::default())?;
            zip.write_all(&report::needs_csv(&result.result.needs)?)?;

            if let Some(post_csv) = post_csv {
                zip.start_file("postprocessing.csv", SimpleFileOptions::default())?;
                zip.write_all(&post_csv)?;
            }

            zip.start_file("summary.json", SimpleFileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(&summary)?.as_bytes())?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&output_path, &zip_data).await?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metadata::{GenderRatios, NeedsProfile, PostprocessorSettings};
    use crate::utils::error::ImpactError;
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn insert(&self, path: &str, content: &str) {
            self.files
                .lock()
                .await
                .insert(path.to_string(), content.as_bytes().to_vec());
        }

        async fn get(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files.lock().await.get(path).cloned().ok_or_else(|| {
                ImpactError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        unit: String,
        thresholds: Vec<f64>,
        needs: NeedsProfile,
        postprocessors: PostprocessorSettings,
    }

    impl Default for MockConfig {
        fn default() -> Self {
            Self {
                unit: "metres".to_string(),
                thresholds: vec![0.7],
                needs: NeedsProfile::bnpb_default(),
                postprocessors: PostprocessorSettings::default(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn analysis_name(&self) -> &str {
            "mock"
        }
        fn hazard_path(&self) -> &str {
            "depth.asc"
        }
        fn hazard_unit(&self) -> &str {
            &self.unit
        }
        fn population_path(&self) -> &str {
            "people.asc"
        }
        fn output_path(&self) -> &str {
            "out"
        }
        fn thresholds(&self) -> &[f64] {
            &self.thresholds
        }
        fn needs_profile(&self) -> &NeedsProfile {
            &self.needs
        }
        fn postprocessors(&self) -> &PostprocessorSettings {
            &self.postprocessors
        }
        fn worker_threads(&self) -> usize {
            1
        }
        fn tile_rows(&self) -> usize {
            1
        }
        fn raster_format(&self) -> &str {
            "asc"
        }
    }

    const DEPTH: &str = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n0.5 0.8\n1.0 0.0\n";
    const PEOPLE: &str = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n10 20\n30 40\n";

    async fn seeded_storage() -> MockStorage {
        let storage = MockStorage::default();
        storage.insert("depth.asc", DEPTH).await;
        storage.insert("people.asc", PEOPLE).await;
        storage
    }

    #[tokio::test]
    async fn test_extract_decodes_both_rasters() {
        let pipeline = FilePipeline::new(seeded_storage().await, MockConfig::default());
        let inputs = pipeline.extract().await.unwrap();

        assert_eq!(inputs.hazard.depth(0, 1), Some(0.8));
        assert_eq!(inputs.population.total(), 100.0);
    }

    #[tokio::test]
    async fn test_extract_rejects_unknown_unit() {
        let config = MockConfig {
            unit: "fathoms".to_string(),
            ..MockConfig::default()
        };
        let pipeline = FilePipeline::new(seeded_storage().await, config);
        assert!(matches!(
            pipeline.extract().await,
            Err(ImpactError::UnknownUnitError { .. })
        ));
    }

    #[tokio::test]
    async fn test_transform_runs_engine_and_postprocessors() {
        let config = MockConfig {
            postprocessors: PostprocessorSettings {
                gender: Some(GenderRatios::default()),
                age: None,
            },
            ..MockConfig::default()
        };
        let pipeline = FilePipeline::new(seeded_storage().await, config);
        let inputs = pipeline.extract().await.unwrap();
        let result = pipeline.transform(inputs).await.unwrap();

        assert_eq!(result.result.total_affected, 50.0);
        assert_eq!(result.result.total_population, 100.0);
        assert_eq!(result.postprocessing.len(), 1);
        assert_eq!(result.postprocessing[0].rows[0].1, 25.0);
    }

    #[tokio::test]
    async fn test_transform_rejects_bad_thresholds() {
        let config = MockConfig {
            thresholds: vec![1.0, 0.5],
            ..MockConfig::default()
        };
        let pipeline = FilePipeline::new(seeded_storage().await, config);
        let inputs = pipeline.extract().await.unwrap();
        assert!(matches!(
            pipeline.transform(inputs).await,
            Err(ImpactError::InvalidThresholdSetError { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_writes_zip_bundle() {
        let storage = seeded_storage().await;
        let pipeline = FilePipeline::new(storage.clone(), MockConfig::default());
        let inputs = pipeline.extract().await.unwrap();
        let result = pipeline.transform(inputs).await.unwrap();
        let path = pipeline.load(result).await.unwrap();

        assert_eq!(path, format!("out/{}", OUTPUT_ARCHIVE));
        let bytes = storage.get(&path).await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

        let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["affected_population.asc", "breakdown.csv", "needs.csv", "summary.json"]
        );

        let mut summary = String::new();
        archive
            .by_name("summary.json")
            .unwrap()
            .read_to_string(&mut summary)
            .unwrap();
        let summary: serde_json::Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(summary["total_affected"], 50.0);
        assert_eq!(summary["analysis"], "mock");
        assert_eq!(summary["provenance"]["hazard_source"], "depth.asc");
    }
}
