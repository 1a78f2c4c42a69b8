use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use calib_labeler::{
    CalibrationPattern, CameraIntrinsics, DepthImage, Frame, LabelPublisher, LabelerConfig,
    LabelerError, LabelerPhase, Labels, LaserScan, Modality, PassDetails, PointCloud, Seed,
    SensorData, SensorDescriptor, SensorLabeler, DEFAULT_LIDAR3D_MARKER,
};
use image::{Luma, Rgb, RgbImage};
use nalgebra::{Point2, Point3};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn descriptor(modality: Modality) -> SensorDescriptor {
    SensorDescriptor {
        name: format!("{modality}_sensor"),
        parent: "base_link".to_string(),
        topic: format!("/{modality}/data"),
        modality,
        camera_info: (modality == Modality::Depth).then(|| CameraIntrinsics {
            width: 160,
            height: 120,
            fx: 120.0,
            fy: 120.0,
            cx: 79.5,
            cy: 59.5,
        }),
    }
}

fn config(modality: Modality) -> LabelerConfig {
    let mut cfg = LabelerConfig::new(descriptor(modality), CalibrationPattern::chessboard(7, 5, 0.1));
    cfg.params.rng_seed = Some(5);
    cfg
}

#[derive(Default)]
struct Recorder {
    labels: Mutex<Vec<(f64, String, Labels)>>,
    images: Mutex<usize>,
    seeds: Mutex<Vec<Seed>>,
}

impl LabelPublisher for Recorder {
    fn publish_labels(&self, _sensor: &str, stamp: f64, frame_id: &str, labels: &Labels) {
        self.labels
            .lock()
            .expect("lock")
            .push((stamp, frame_id.to_string(), labels.clone()));
    }

    fn publish_debug_image(&self, _sensor: &str, _stamp: f64, _frame_id: &str, _image: &RgbImage) {
        *self.images.lock().expect("lock") += 1;
    }

    fn publish_seed(&self, _sensor: &str, seed: &Seed) {
        self.seeds.lock().expect("lock").push(*seed);
    }
}

fn chessboard_image() -> RgbImage {
    let (cols, rows, square, margin) = (7u32, 5u32, 20u32, 30u32);
    RgbImage::from_fn(cols * square + 2 * margin, rows * square + 2 * margin, |x, y| {
        let inside = x >= margin && y >= margin && x < margin + cols * square && y < margin + rows * square;
        if inside && ((x - margin) / square + (y - margin) / square) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

#[test]
fn initial_seeds_follow_modality() {
    let rgb = SensorLabeler::new(config(Modality::Rgb)).expect("rgb");
    assert_eq!(rgb.seed(), None);
    assert_eq!(rgb.phase(), LabelerPhase::Idle);

    let lidar2d = SensorLabeler::new(config(Modality::Lidar2d)).expect("lidar2d");
    assert_eq!(lidar2d.seed(), Some(Seed::Position(Point3::origin())));

    let lidar3d = SensorLabeler::new(config(Modality::Lidar3d)).expect("lidar3d");
    let [x, y, z] = DEFAULT_LIDAR3D_MARKER;
    assert_eq!(lidar3d.seed(), Some(Seed::Position(Point3::new(x, y, z))));

    let mut cfg = config(Modality::Lidar3d);
    cfg.params.initial_marker = Some([1.0, 2.0, 3.0]);
    let custom = SensorLabeler::new(cfg).expect("lidar3d");
    assert_eq!(custom.seed(), Some(Seed::Position(Point3::new(1.0, 2.0, 3.0))));

    let depth = SensorLabeler::new(config(Modality::Depth)).expect("depth");
    assert_eq!(depth.seed(), Some(Seed::Pixel(Point2::new(80.0, 60.0))));
}

#[test]
fn misconfiguration_fails_at_construction() {
    let mut no_intrinsics = config(Modality::Depth);
    no_intrinsics.sensor.camera_info = None;
    assert!(matches!(
        SensorLabeler::new(no_intrinsics),
        Err(LabelerError::Config(_))
    ));

    let mut bad_pattern = config(Modality::Rgb);
    bad_pattern.pattern = CalibrationPattern::chessboard(2, 5, 0.1);
    assert!(SensorLabeler::new(bad_pattern).is_err());

    let mut bad_dict = config(Modality::Rgb);
    bad_dict.pattern = CalibrationPattern::charuco(7, 5, 0.1, 0.07, "DICT_NOPE");
    assert!(matches!(
        SensorLabeler::new(bad_dict),
        Err(LabelerError::Config(_))
    ));
}

#[test]
fn rgb_frame_publishes_keypoints_and_debug_image() {
    init_logs();
    let recorder = Arc::new(Recorder::default());
    let labeler = SensorLabeler::with_publisher(config(Modality::Rgb), recorder.clone()).expect("rgb");
    let out = labeler
        .process_frame(Frame::new(12.5, "camera", SensorData::Image(chessboard_image())))
        .expect("pass");

    assert!(out.labels.detected);
    let keypoints = out.labels.idxs.keypoints().expect("keypoints");
    assert_eq!(keypoints.len(), 24);
    assert!(keypoints.iter().all(|k| k.id.is_none()));
    assert!(out.debug_image.is_some());
    assert_eq!(out.stamp, 12.5);
    assert_eq!(out.frame_id, "camera");
    assert_eq!(labeler.phase(), LabelerPhase::Labeling);
    assert_eq!(labeler.last_stamp(), Some(12.5));
    assert_eq!(labeler.last_labels(), out.labels);

    let published = recorder.labels.lock().expect("lock");
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, 12.5);
    assert_eq!(published[0].2, out.labels);
    assert_eq!(*recorder.images.lock().expect("lock"), 1);
}

#[test]
fn lidar2d_pass_moves_the_seed_to_the_cluster() {
    let labeler = SensorLabeler::new(config(Modality::Lidar2d)).expect("lidar2d");
    let mut ranges = vec![0.0f32; 100];
    for r in &mut ranges[30..50] {
        *r = 2.0;
    }
    let scan = LaserScan {
        angle_min: -0.5,
        angle_increment: 0.01,
        ranges,
    };
    let out = labeler
        .process_frame(Frame::new(1.0, "laser", SensorData::Scan(scan)))
        .expect("pass");
    assert!(out.labels.detected);
    // index 30 follows a dropout
    let expected: Vec<usize> = (31..50).collect();
    assert_eq!(out.labels.idxs.indices(), Some(expected.as_slice()));
    let Some(Seed::Position(seed)) = out.seed else {
        panic!("expected a position seed");
    };
    assert_relative_eq!(seed.z, 0.0);
    assert!(seed.x > 1.9);
    assert!(matches!(out.details, PassDetails::Scan { .. }));
    assert_eq!(labeler.seed(), out.seed);
}

#[test]
fn lidar3d_miss_keeps_marker() {
    let labeler = SensorLabeler::new(config(Modality::Lidar3d)).expect("lidar3d");
    let before = labeler.seed();
    let cloud = PointCloud {
        points: vec![Point3::new(10.0, 0.0, 0.0), Point3::new(0.0, 10.0, 0.0)],
    };
    let out = labeler
        .process_frame(Frame::new(2.0, "velodyne", SensorData::Cloud(cloud)))
        .expect("pass");
    assert!(!out.labels.detected);
    assert_eq!(out.labels.idxs_limit_points, Some(Vec::new()));
    assert_eq!(out.seed, before);
}

#[test]
fn lidar3d_finds_board_near_marker() {
    let labeler = SensorLabeler::new(config(Modality::Lidar3d)).expect("lidar3d");
    labeler
        .set_seed(Seed::Position(Point3::new(2.0, 0.0, 0.0)))
        .expect("seed");
    let mut points = Vec::new();
    for j in 0..12 {
        for i in 0..12 {
            points.push(Point3::new(2.0, -0.3 + 0.05 * i as f64, -0.3 + 0.05 * j as f64));
        }
    }
    let n = points.len();
    let out = labeler
        .process_frame(Frame::new(3.0, "velodyne", SensorData::Cloud(PointCloud { points })))
        .expect("pass");
    assert!(out.labels.detected);
    let limit = out.labels.idxs_limit_points.as_ref().expect("limit");
    assert_eq!(out.labels.idxs.len() + limit.len(), n);
    // 12 x 12 grid: 44 boundary points
    assert_eq!(limit.len(), 44);
}

#[test]
fn depth_click_seeds_next_pass() {
    let labeler = SensorLabeler::new(config(Modality::Depth)).expect("depth");
    // board on the left, far from the default center seed
    let depth = DepthImage::from_fn(160, 120, |x, y| {
        Luma([if (10..60).contains(&x) && (20..100).contains(&y) { 1.2 } else { 0.0 }])
    });

    let miss = labeler
        .process_frame(Frame::new(1.0, "depth", SensorData::Depth(depth.clone())))
        .expect("pass");
    assert!(!miss.labels.detected);
    assert_eq!(miss.seed, Some(Seed::Pixel(Point2::new(80.0, 60.0))));

    // debug image is downsampled by 2: (15, 30) is (30.5, 60.5) at full size
    let picked = labeler.pick_debug_pixel(15.0, 30.0).expect("pick");
    assert_eq!(picked, Seed::Pixel(Point2::new(30.5, 60.5)));
    assert_eq!(labeler.seed(), Some(picked));

    let hit = labeler
        .process_frame(Frame::new(2.0, "depth", SensorData::Depth(depth)))
        .expect("pass");
    assert!(hit.labels.detected);
    let Some(Seed::Pixel(seed)) = hit.seed else {
        panic!("expected a pixel seed");
    };
    assert_relative_eq!(seed.x, 34.5, epsilon = 1e-9);
    assert_relative_eq!(seed.y, 59.5, epsilon = 1e-9);
    assert!(hit.debug_image.is_some());
}

#[test]
fn depth_seed_on_a_hole_finds_the_board() {
    let labeler = SensorLabeler::new(config(Modality::Depth)).expect("depth");
    // board around the center seed with missing depth right under it
    let depth = DepthImage::from_fn(160, 120, |x, y| {
        let hole = (76..86).contains(&x) && (56..66).contains(&y);
        let board = (40..120).contains(&x) && (30..90).contains(&y);
        Luma([if board && !hole { 1.2 } else { 0.0 }])
    });
    let out = labeler
        .process_frame(Frame::new(1.0, "depth", SensorData::Depth(depth)))
        .expect("pass");
    assert!(out.labels.detected);
}

#[test]
fn mismatched_frames_and_seeds_are_rejected() {
    let labeler = SensorLabeler::new(config(Modality::Lidar2d)).expect("lidar2d");
    let err = labeler
        .process_frame(Frame::new(0.0, "x", SensorData::Cloud(PointCloud::default())))
        .expect_err("mismatch");
    assert!(matches!(
        err,
        LabelerError::FrameMismatch {
            expected: Modality::Lidar2d,
            got: Modality::Lidar3d,
            ..
        }
    ));
    assert_eq!(labeler.phase(), LabelerPhase::Idle);
    assert!(labeler.set_seed(Seed::Pixel(Point2::new(1.0, 1.0))).is_err());
    assert!(labeler.pick_debug_pixel(1.0, 1.0).is_err());

    let rgb = SensorLabeler::new(config(Modality::Rgb)).expect("rgb");
    assert!(rgb.set_seed(Seed::Position(Point3::origin())).is_err());
}

#[test]
fn passive_sensor_never_labels() {
    let recorder = Arc::new(Recorder::default());
    let mut cfg = config(Modality::Rgb);
    cfg.label_data = false;
    let labeler = SensorLabeler::with_publisher(cfg, recorder.clone()).expect("rgb");
    let out = labeler
        .process_frame(Frame::new(4.0, "camera", SensorData::Image(chessboard_image())))
        .expect("pass");
    assert!(!out.labels.detected);
    assert!(out.labels.idxs.is_empty());
    assert_eq!(out.details, PassDetails::Skipped);
    assert_eq!(labeler.phase(), LabelerPhase::Passive);
    assert_eq!(labeler.last_stamp(), Some(4.0));
    assert!(recorder.labels.lock().expect("lock").is_empty());
}

#[test]
fn config_round_trips_through_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("labeler.json");
    let mut cfg = config(Modality::Depth);
    cfg.params.depth.scatter_seed = false;
    cfg.params.equalize_histogram = true;
    cfg.write_json(&path).expect("write");
    let loaded = LabelerConfig::load_json(&path).expect("load");
    assert_eq!(loaded, cfg);

    let missing = LabelerConfig::load_json(dir.path().join("missing.json"));
    assert!(matches!(missing, Err(LabelerError::Io(_))));
}
