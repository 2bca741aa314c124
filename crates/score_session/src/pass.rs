//! Capture pass driver
//!
//! Runs preprocess → segment → per-region OCR for one session and reports
//! every step back to the controller's command queue. Region tasks are
//! joined explicitly: each result is forwarded as it lands and the
//! completion event is only sent once the join set is empty, so the
//! history commit never races the last region.

use crate::controller::{Backends, Command};
use core_pipeline::ocr::extract_number;
use core_pipeline::preprocess::preprocess_or_original;
use core_pipeline::segment::segment_regions;
use core_pipeline::{DetectedNumber, PipelineConfig, SessionId, SessionPhase};
use image::DynamicImage;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Events a pass reports to the controller
#[derive(Debug)]
pub(crate) enum PassEvent {
    Phase(SessionPhase),
    /// `index` is the region's position in reading order
    RegionCompleted {
        index: usize,
        number: Option<DetectedNumber>,
    },
    Completed {
        /// Preprocessed snapshot for the history log
        image: Arc<DynamicImage>,
        regions: usize,
    },
}

pub(crate) struct PassContext {
    pub session: SessionId,
    pub image: Arc<DynamicImage>,
    pub config: Arc<PipelineConfig>,
    pub backends: Backends,
    pub events: mpsc::UnboundedSender<Command>,
}

impl PassContext {
    fn report(&self, event: PassEvent) -> bool {
        self.events
            .send(Command::Pass {
                session: self.session,
                event,
            })
            .is_ok()
    }
}

/// Drive one capture pass to completion
pub(crate) async fn run_pass(ctx: PassContext) {
    let session = ctx.session;
    info!("Pass {} started ({}x{})", session, ctx.image.width(), ctx.image.height());

    if !ctx.report(PassEvent::Phase(SessionPhase::Preprocessing)) {
        return;
    }
    let processed = {
        let image = ctx.image.clone();
        let config = ctx.config.clone();
        match tokio::task::spawn_blocking(move || preprocess_or_original(&image, &config.preprocess))
            .await
        {
            Ok(processed) => Arc::new(processed),
            Err(e) => {
                warn!("Preprocessing task failed, using original image: {}", e);
                ctx.image.clone()
            }
        }
    };
    let gray = Arc::new(processed.to_luma8());

    if !ctx.report(PassEvent::Phase(SessionPhase::Segmenting)) {
        return;
    }
    let regions = {
        let gray = gray.clone();
        let detector = ctx.backends.detector.clone();
        tokio::task::spawn_blocking(move || segment_regions(&gray, detector.as_ref()))
            .await
            .unwrap_or_else(|e| {
                warn!("Segmentation task failed: {}", e);
                Vec::new()
            })
    };
    let region_count = regions.len();
    debug!("Pass {}: {} regions to recognize", session, region_count);

    if !ctx.report(PassEvent::Phase(SessionPhase::ExtractingRegions {
        total: region_count,
        pending: region_count,
    })) {
        return;
    }

    let permits = Arc::new(Semaphore::new(ctx.config.max_concurrent_regions.max(1)));
    let mut tasks = JoinSet::new();
    for (index, region) in regions.into_iter().enumerate() {
        let gray = gray.clone();
        let recognizer = ctx.backends.recognizer.clone();
        let config = ctx.config.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let number = tokio::task::spawn_blocking(move || {
                extract_number(&gray, &region, recognizer.as_ref(), &config.recognition)
            })
            .await;
            (index, number)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (index, number) = match joined {
            Ok((index, Ok(number))) => (index, number),
            Ok((index, Err(e))) => {
                warn!("Region {} failed in pass {}: {}", index, session, e);
                (index, None)
            }
            Err(e) => {
                // Region unknown; still counts towards the pending total
                warn!("Region task failed in pass {}: {}", session, e);
                (region_count, None)
            }
        };
        if !ctx.report(PassEvent::RegionCompleted { index, number }) {
            return;
        }
    }

    ctx.report(PassEvent::Completed {
        image: processed,
        regions: region_count,
    });
    info!("Pass {} finished", session);
}
