//! One labeler per sensor: frame intake, seed state and pass serialization.
//!
//! The whole "store frame, label, publish" sequence runs under a single state
//! lock, so passes of one sensor never interleave. Out-of-band seeds go
//! through a separate slot that is only held for a swap and is drained at the
//! start of the next pass.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use calib_labeler_core::{CalibrationPattern, Frame, Labels, Modality, Seed, SensorDescriptor};
use image::RgbImage;
use log::{debug, info, warn};
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::pipeline::{PassDetails, PassResult, Pipeline};
use crate::{LabelPublisher, LabelerConfig, LabelerError, NoopPublisher};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelerPhase {
    /// No frame received yet.
    Idle,
    /// Labels every incoming frame.
    Labeling,
    /// Receives frames without labeling them (`label_data = false`).
    Passive,
}

/// Result of one pass; valid only for the frame it names.
#[derive(Clone, Debug)]
pub struct LabelingOutput {
    pub stamp: f64,
    pub frame_id: String,
    pub labels: Labels,
    /// Seed after the pass.
    pub seed: Option<Seed>,
    pub debug_image: Option<RgbImage>,
    pub details: PassDetails,
}

struct LabelerState {
    frame: Option<Frame>,
    labels: Labels,
    seed: Option<Seed>,
    rng: StdRng,
    phase: LabelerPhase,
}

pub struct SensorLabeler {
    config: LabelerConfig,
    pipeline: Pipeline,
    state: Mutex<LabelerState>,
    pending_seed: Mutex<Option<Seed>>,
    publisher: Arc<dyn LabelPublisher>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SensorLabeler {
    pub fn new(config: LabelerConfig) -> Result<Self, LabelerError> {
        Self::with_publisher(config, Arc::new(NoopPublisher))
    }

    /// Validate `config` and build the modality pipeline; any
    /// misconfiguration is reported here and never per frame.
    pub fn with_publisher(
        config: LabelerConfig,
        publisher: Arc<dyn LabelPublisher>,
    ) -> Result<Self, LabelerError> {
        config.validate()?;
        let pipeline = Pipeline::build(&config)?;
        let rng = match config.params.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let modality = config.sensor.modality;
        let state = LabelerState {
            frame: None,
            labels: Labels::empty(modality),
            seed: Pipeline::initial_seed(&config),
            rng,
            phase: LabelerPhase::Idle,
        };
        info!(
            "labeler '{}': {} sensor, label_data = {}",
            config.sensor.name, modality, config.label_data
        );
        Ok(Self {
            config,
            pipeline,
            state: Mutex::new(state),
            pending_seed: Mutex::new(None),
            publisher,
        })
    }

    pub fn descriptor(&self) -> &SensorDescriptor {
        &self.config.sensor
    }

    pub fn pattern(&self) -> &CalibrationPattern {
        &self.config.pattern
    }

    pub fn phase(&self) -> LabelerPhase {
        lock(&self.state).phase
    }

    /// Seed the next pass starts from; a pending out-of-band seed wins.
    pub fn seed(&self) -> Option<Seed> {
        if let Some(pending) = *lock(&self.pending_seed) {
            return Some(pending);
        }
        lock(&self.state).seed
    }

    pub fn last_labels(&self) -> Labels {
        lock(&self.state).labels.clone()
    }

    pub fn last_stamp(&self) -> Option<f64> {
        lock(&self.state).frame.as_ref().map(|f| f.stamp)
    }

    /// Replace the seed used by the next pass (last writer wins).
    pub fn set_seed(&self, seed: Seed) -> Result<(), LabelerError> {
        let modality = self.config.sensor.modality;
        let accepted = match modality {
            Modality::Rgb => false,
            Modality::Lidar2d | Modality::Lidar3d => seed.position().is_some(),
            Modality::Depth => seed.pixel().is_some(),
        };
        if !accepted {
            return Err(LabelerError::SeedMismatch {
                sensor: self.config.sensor.name.clone(),
                modality,
            });
        }
        *lock(&self.pending_seed) = Some(seed);
        debug!("labeler '{}': pending seed {:?}", self.config.sensor.name, seed);
        Ok(())
    }

    /// Seed a depth sensor from a click on its (downsampled) debug image.
    pub fn pick_debug_pixel(&self, x: f64, y: f64) -> Result<Seed, LabelerError> {
        let Some(scale) = self.pipeline.depth_scale() else {
            return Err(LabelerError::SeedMismatch {
                sensor: self.config.sensor.name.clone(),
                modality: self.config.sensor.modality,
            });
        };
        let s = scale as f64;
        let seed = Seed::Pixel(Point2::new((x + 0.5) * s - 0.5, (y + 0.5) * s - 0.5));
        self.set_seed(seed)?;
        Ok(seed)
    }

    /// Label `frame`, waiting for an in-flight pass to finish first.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(sensor = %self.config.sensor.name, stamp = frame.stamp))
    )]
    pub fn process_frame(&self, frame: Frame) -> Result<LabelingOutput, LabelerError> {
        self.check_frame(&frame)?;
        let mut state = lock(&self.state);
        Ok(self.run_pass(&mut state, frame))
    }

    /// Label `frame` unless a pass is in flight, in which case the frame is
    /// dropped with [`LabelerError::Busy`].
    pub fn try_process_frame(&self, frame: Frame) -> Result<LabelingOutput, LabelerError> {
        self.check_frame(&frame)?;
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("labeler '{}': busy, dropping frame", self.config.sensor.name);
                return Err(LabelerError::Busy(self.config.sensor.name.clone()));
            }
        };
        Ok(self.run_pass(&mut state, frame))
    }

    fn check_frame(&self, frame: &Frame) -> Result<(), LabelerError> {
        let expected = self.config.sensor.modality;
        let got = frame.data.modality();
        if got != expected {
            warn!(
                "labeler '{}': rejected {} frame '{}'",
                self.config.sensor.name, got, frame.frame_id
            );
            return Err(LabelerError::FrameMismatch {
                sensor: self.config.sensor.name.clone(),
                expected,
                got,
            });
        }
        Ok(())
    }

    fn run_pass(&self, state: &mut LabelerState, frame: Frame) -> LabelingOutput {
        let name = &self.config.sensor.name;
        let modality = self.config.sensor.modality;
        if let Some(seed) = lock(&self.pending_seed).take() {
            state.seed = Some(seed);
        }
        state.labels = Labels::empty(modality);

        let frame = state.frame.insert(frame);
        if !self.config.label_data {
            state.phase = LabelerPhase::Passive;
            return LabelingOutput {
                stamp: frame.stamp,
                frame_id: frame.frame_id.clone(),
                labels: state.labels.clone(),
                seed: state.seed,
                debug_image: None,
                details: PassDetails::Skipped,
            };
        }
        state.phase = LabelerPhase::Labeling;

        let PassResult {
            labels,
            seed,
            debug_image,
            details,
        } = self.pipeline.run(&frame.data, state.seed, &mut state.rng);
        debug!(
            "labeler '{name}': frame {:.3} detected = {}, {} labels",
            frame.stamp,
            labels.detected,
            labels.idxs.len()
        );

        self.publisher
            .publish_labels(name, frame.stamp, &frame.frame_id, &labels);
        if let Some(image) = &debug_image {
            self.publisher
                .publish_debug_image(name, frame.stamp, &frame.frame_id, image);
        }
        if let Some(seed) = &seed {
            self.publisher.publish_seed(name, seed);
        }

        state.labels = labels.clone();
        state.seed = seed;
        LabelingOutput {
            stamp: frame.stamp,
            frame_id: frame.frame_id.clone(),
            labels,
            seed,
            debug_image,
            details,
        }
    }
}
