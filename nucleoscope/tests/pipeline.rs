//! End-to-end batch runs over synthetic TIFF folders.

use std::fs::File;
use std::path::{Path, PathBuf};

use nucleoscope::{
    aggregate::ReplicateSet, generate_report, Genotype, ImageRecord, MemorySink, MultiSink,
    PersistenceError, Pipeline, PipelineConfig, Region, ResultSink, SqliteSink, SummaryCsvSink,
};
use rusqlite::Connection;
use tiff::encoder::{colortype, TiffEncoder};

const SIZE: usize = 64;
const BACKGROUND: u16 = 1000;
const SPOT: u16 = 10000;

/// 64x64 gray16 plane with 7x7 spots at the given top-left corners.
fn plane_with_spots(corners: &[(usize, usize)]) -> Vec<u16> {
    let mut data = vec![BACKGROUND; SIZE * SIZE];
    for &(x0, y0) in corners {
        for y in y0..y0 + 7 {
            for x in x0..x0 + 7 {
                data[y * SIZE + x] = SPOT;
            }
        }
    }
    data
}

fn write_tiff(path: &Path, pages: &[Vec<u16>]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    for page in pages {
        encoder
            .write_image::<colortype::Gray16>(SIZE as u32, SIZE as u32, page)
            .unwrap();
    }
}

/// Three images: a z-slice with two spots, a two-page stack whose first page
/// has one spot, and an undecodable file.
fn build_dataset(root: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let slice = root.join("control_meristem").join("h2b_seedling1_z1c1.tif");
    write_tiff(&slice, &[plane_with_spots(&[(12, 12), (40, 30)])]);

    let stack = root
        .join("istl_mutant_elongation_zone")
        .join("h2b-istl345_seedling3_elong.TIFF");
    write_tiff(
        &stack,
        &[plane_with_spots(&[(28, 28)]), plane_with_spots(&[(5, 20), (30, 20), (45, 45)])],
    );

    let broken = root.join("broken").join("seedling9_z2.tif");
    std::fs::create_dir_all(broken.parent().unwrap()).unwrap();
    std::fs::write(&broken, b"not an image").unwrap();

    (slice, stack, broken)
}

/// Rejects the first record it is given and keeps the rest.
#[derive(Default)]
struct RejectFirstSink {
    writes: usize,
    kept: MemorySink,
}

impl ResultSink for RejectFirstSink {
    fn write(&mut self, record: &ImageRecord<'_>) -> Result<(), PersistenceError> {
        self.writes += 1;
        if self.writes == 1 {
            return Err(PersistenceError::Io {
                path: record.metadata().path.clone(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.kept.write(record)
    }
}

/// Panics on records whose file name contains `trigger`.
struct PanickingSink {
    trigger: &'static str,
    kept: MemorySink,
}

impl ResultSink for PanickingSink {
    fn write(&mut self, record: &ImageRecord<'_>) -> Result<(), PersistenceError> {
        let name = record.metadata().path.file_name().unwrap().to_string_lossy();
        if name.contains(self.trigger) {
            panic!("corrupt record for {name}");
        }
        self.kept.write(record)
    }
}

fn quiet_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.output.panel_size = 64;
    config
}

#[test]
fn test_batch_persists_results_and_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("raw");
    let output = dir.path().join("out");
    let (slice, stack, broken) = build_dataset(&root);

    let config = quiet_config();
    let db_path = config.output.resolved_db_path(&output);
    let summary_path = config.output.resolved_summary_path(&output);
    let mut sink = MultiSink::new()
        .with(SqliteSink::open(&db_path).unwrap())
        .with(SummaryCsvSink::open(&summary_path).unwrap());

    let report = Pipeline::new(config).run_batch(&root, &output, &mut sink);
    drop(sink);

    assert_eq!(report.total(), 3);
    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, broken);

    let by_path = |p: &Path| report.processed.iter().find(|r| r.path == p).unwrap();
    assert_eq!(by_path(&slice).spot_count, 2);
    assert_eq!(by_path(&slice).total_area, 90);
    // only the first page of the stack is analyzed
    assert_eq!(by_path(&stack).spot_count, 1);
    assert!((by_path(&stack).mean_intensity - 255.0).abs() < 1e-9);

    // Panels mirror the input folders
    assert!(output.join("control_meristem").join("h2b_seedling1_z1c1_seg.png").exists());
    assert!(output
        .join("istl_mutant_elongation_zone")
        .join("h2b-istl345_seedling3_elong_seg.png")
        .exists());

    // SQLite: one image row per processed file, one spot row per spot
    let conn = Connection::open(&db_path).unwrap();
    let images: i64 = conn
        .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
        .unwrap();
    let spots: i64 = conn
        .query_row("SELECT COUNT(*) FROM spots", [], |row| row.get(0))
        .unwrap();
    assert_eq!(images, 2);
    assert_eq!(spots, 3);
    let null_zslices: i64 = conn
        .query_row("SELECT COUNT(*) FROM images WHERE zslice IS NULL", [], |row| row.get(0))
        .unwrap();
    assert_eq!(null_zslices, 1);

    // Summary CSV: header plus two rows
    let records = nucleoscope::sink::read_summary_records(&summary_path).unwrap();
    assert_eq!(records.len(), 2);
    let meristem = records.iter().find(|r| r.region == Region::Meristem).unwrap();
    assert_eq!(meristem.genotype, Genotype::Control);
    assert_eq!(meristem.seedling, Some(1));
    assert_eq!(meristem.zslice, Some(1));
    let elongation = records.iter().find(|r| r.region == Region::Elongation).unwrap();
    assert_eq!(elongation.genotype, Genotype::Mutant);
    assert_eq!(elongation.seedling, Some(3));
    assert_eq!(elongation.zslice, None);
}

#[test]
fn test_second_run_appends_without_second_header() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("raw");
    let output = dir.path().join("out");
    build_dataset(&root);

    let mut config = quiet_config();
    config.output.visualize = false;
    let summary_path = config.output.resolved_summary_path(&output);

    for _ in 0..2 {
        let mut sink = SummaryCsvSink::open(&summary_path).unwrap();
        Pipeline::new(config.clone()).run_batch(&root, &output, &mut sink);
    }

    let text = std::fs::read_to_string(&summary_path).unwrap();
    assert_eq!(text.matches("filename,region,genotype").count(), 1);
    assert_eq!(text.lines().count(), 1 + 2 * 2);
    assert!(!output.join("control_meristem").exists());
}

#[test]
fn test_parallel_batch_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("raw");
    build_dataset(&root);

    let mut config = quiet_config();
    config.output.visualize = false;

    let mut sequential = MemorySink::new();
    let seq_report = Pipeline::new(config.clone()).run_batch(&root, dir.path(), &mut sequential);

    config.output.parallel = true;
    let mut parallel = MemorySink::new();
    let par_report = Pipeline::new(config).run_batch(&root, dir.path(), &mut parallel);

    assert_eq!(seq_report, par_report);

    let mut a = sequential.summaries;
    let mut b = parallel.summaries;
    a.sort_by(|x, y| x.metadata.path.cmp(&y.metadata.path));
    b.sort_by(|x, y| x.metadata.path.cmp(&y.metadata.path));
    assert_eq!(a, b);
}

#[test]
fn test_pipeline_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let (slice, _, _) = build_dataset(dir.path());
    let pipeline = Pipeline::new(quiet_config());

    let first = pipeline.analyze(&slice).unwrap();
    let second = pipeline.analyze(&slice).unwrap();

    assert_eq!(first.segmentation.spots, second.segmentation.spots);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn test_report_from_batch_summary() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("raw");
    let output = dir.path().join("out");
    build_dataset(&root);

    let mut config = quiet_config();
    config.output.visualize = false;
    let summary_path = config.output.resolved_summary_path(&output);
    let mut sink = SummaryCsvSink::open(&summary_path).unwrap();
    Pipeline::new(config).run_batch(&root, &output, &mut sink);
    drop(sink);

    let reports = generate_report(&summary_path, &output).unwrap();

    let zslices = reports.iter().find(|r| r.set == ReplicateSet::ZSlices).unwrap();
    assert_eq!(zslices.stats.len(), 1);
    assert_eq!(zslices.stats[0].genotype, Genotype::Control);
    assert!((zslices.stats[0].total_area_mean - 90.0).abs() < 1e-9);

    let stacks = reports.iter().find(|r| r.set == ReplicateSet::Stacks).unwrap();
    assert_eq!(stacks.stats.len(), 1);
    assert_eq!(stacks.stats[0].region, Region::Elongation);

    for name in [
        "condition_stats_zslices.csv",
        "condition_stats_stacks.csv",
        "bar_zslices.png",
        "bar_stacks.png",
    ] {
        assert!(output.join(name).exists(), "missing {name}");
    }
}

#[test]
fn test_write_failure_skips_only_that_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("raw");
    let (slice, stack, broken) = build_dataset(&root);

    let mut config = quiet_config();
    config.output.visualize = false;
    let mut sink = RejectFirstSink::default();

    // sorted order: broken (load error), slice (rejected), stack
    let report = Pipeline::new(config).run_batch(&root, dir.path(), &mut sink);

    assert_eq!(report.total(), 3);
    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.processed[0].path, stack);
    let failed: Vec<&Path> = report.failed.iter().map(|f| f.path.as_path()).collect();
    assert_eq!(failed, vec![broken.as_path(), slice.as_path()]);
    assert!(report.failed[1].error.contains("disk full"));

    assert_eq!(sink.writes, 2);
    assert_eq!(sink.kept.len(), 1);
    assert_eq!(sink.kept.summaries[0].metadata.path, stack);
}

#[test]
fn test_panic_in_one_file_does_not_stop_batch() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("raw");
    let (slice, stack, broken) = build_dataset(&root);

    for parallel in [false, true] {
        let mut config = quiet_config();
        config.output.visualize = false;
        config.output.parallel = parallel;
        let mut sink = PanickingSink {
            trigger: "seedling1",
            kept: MemorySink::new(),
        };

        let report = Pipeline::new(config).run_batch(&root, dir.path(), &mut sink);

        assert_eq!(report.processed.len(), 1, "parallel = {parallel}");
        assert_eq!(report.processed[0].path, stack);
        assert_eq!(report.failed.len(), 2);
        let panicked = report.failed.iter().find(|f| f.path == slice).unwrap();
        assert!(panicked.error.starts_with("Processing panicked: corrupt record"));
        assert!(report.failed.iter().any(|f| f.path == broken));
        assert_eq!(sink.kept.len(), 1);
    }
}

#[test]
fn test_panel_failure_keeps_persisted_file_processed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("raw");
    let output = dir.path().join("out");
    let (slice, stack, broken) = build_dataset(&root);

    // a plain file where the panel folder for the slice should go
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("control_meristem"), b"in the way").unwrap();

    let mut sink = MemorySink::new();
    let report = Pipeline::new(quiet_config()).run_batch(&root, &output, &mut sink);

    assert_eq!(sink.len(), 2);
    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, broken);

    let by_path = |p: &Path| report.processed.iter().find(|r| r.path == p).unwrap();
    assert_eq!(by_path(&slice).panel, None);
    assert_eq!(by_path(&slice).spot_count, 2);
    let stack_panel = by_path(&stack).panel.clone().unwrap();
    assert!(stack_panel.exists());
}
