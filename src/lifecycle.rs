//! Deterministic resource teardown.
//!
//! One entry point for every teardown site (style switch, audio-source
//! change, host unmount): cancel the frame loop, disconnect the analyzer,
//! dispose the style node, dispose the scene host — in that order. Each
//! step is isolated so a failure in one never prevents the rest, and each
//! underlying dispose is idempotent, so calling `teardown` again is a
//! no-op.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::frame::FrameScheduler;
use crate::pipeline::VisualizerPipeline;
use crate::scene::SceneHost;

/// Run the full teardown sequence over whatever parts of the pipeline
/// exist. Missing components are skipped, failed steps are logged and the
/// sequence continues.
pub fn teardown(
    scheduler: &mut FrameScheduler,
    pipeline: Option<&mut VisualizerPipeline>,
    scene: Option<&mut SceneHost>,
) {
    // 1. Stop the loop first: no tick may touch resources mid-teardown
    isolated("cancel render loop", || scheduler.cancel_current());

    if let Some(pipeline) = pipeline {
        // 2. Disconnect the analyzer from the audio tap
        isolated("disconnect analyzer", || pipeline.disconnect_analyzer());

        // 3. Remove and dispose the style instance
        isolated("dispose style", || pipeline.dispose_style());
    }

    // 4. Release the render surface and GPU context
    if let Some(scene) = scene {
        isolated("dispose scene", || {
            scene.detach();
            scene.dispose();
        });
    }
}

/// Run one teardown step, logging instead of propagating a panic
fn isolated<F: FnOnce()>(step: &str, f: F) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::warn!("teardown step '{}' failed, continuing", step);
    }
}
