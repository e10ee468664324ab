//! Cross-component pipeline properties, driven headlessly (no GPU, no
//! audio device): a bare sample tap stands in for the audio system.

use std::sync::{Arc, Mutex};

use glam::Vec2;

use wavescene::frame::FrameScheduler;
use wavescene::lifecycle;
use wavescene::pipeline::VisualizerPipeline;
use wavescene::settings::{StyleKind, VisualizerSettings};
use wavescene::styles::create_style;

fn tap_with(samples: Vec<f32>) -> Arc<Mutex<Vec<f32>>> {
    Arc::new(Mutex::new(samples))
}

fn silent_pipeline(settings: &VisualizerSettings) -> VisualizerPipeline {
    VisualizerPipeline::with_tap(tap_with(vec![0.0; 4096]), 44100, settings).unwrap()
}

#[test]
fn silent_default_scene_matches_exact_contract() {
    // Silent audio buffer, Default style, intensity 1, speed 0.5: after one
    // update the scale is exactly (1,1,1) and rotation.x/y are each 0.005.
    let mut settings = VisualizerSettings::default();
    settings.intensity = 1.0;
    settings.speed = 0.5;

    let mut pipeline = silent_pipeline(&settings);
    let node = pipeline.tick(&settings, 1.0 / 60.0);

    assert_eq!(node.transform.scale.to_array(), [1.0, 1.0, 1.0]);
    assert_eq!(node.transform.rotation.x, 0.005);
    assert_eq!(node.transform.rotation.y, 0.005);
}

#[test]
fn every_style_survives_many_ticks_with_finite_transforms() {
    // Drive each style through the real analyzer with a noisy signal
    let samples: Vec<f32> = (0..8192)
        .map(|i| ((i as f32 * 0.37).sin() + (i as f32 * 0.11).cos()) * 0.4)
        .collect();

    for kind in StyleKind::ALL {
        let mut settings = VisualizerSettings::default();
        settings.style = kind;
        settings.intensity = 1.0;
        settings.speed = 1.0;
        settings.glitch_amount = 0.5;

        let mut pipeline =
            VisualizerPipeline::with_tap(tap_with(samples.clone()), 44100, &settings).unwrap();

        for _ in 0..120 {
            let node = pipeline.tick(&settings, 1.0 / 60.0);
            assert!(node.transform.position.is_finite());
            assert!(node.transform.rotation.is_finite());
            assert!(node.transform.scale.is_finite());
            for part in &node.parts {
                assert!(part.transform.position.is_finite());
                assert!(part.transform.scale.is_finite());
                for vertex in &part.geometry.vertices {
                    assert!(vertex.position.iter().all(|c| c.is_finite()));
                }
            }
        }
    }
}

#[test]
fn style_switching_never_accumulates_instances() {
    let mut settings = VisualizerSettings::default();
    let mut pipeline = silent_pipeline(&settings);

    // Cycle through every style twice; exactly one live instance remains
    for _ in 0..2 {
        for kind in StyleKind::ALL {
            settings.style = kind;
            pipeline.tick(&settings, 1.0 / 60.0);
            assert_eq!(pipeline.style().kind(), kind);
            assert!(!pipeline.style().is_disposed());
            assert!(!pipeline.node().parts.is_empty());
        }
    }
}

#[test]
fn dispose_is_idempotent_for_every_style() {
    let settings = VisualizerSettings::default();
    for kind in StyleKind::ALL {
        let mut style = create_style(kind, &settings);
        style.dispose();
        style.dispose();
        assert!(style.node().parts.is_empty());
    }
}

#[test]
fn wave_silence_keeps_the_half_amplitude_floor() {
    // amp = 0.5 + average*0.01 never degenerates to zero on silence
    let mut settings = VisualizerSettings::default();
    settings.style = StyleKind::Wave;
    settings.speed = 0.0;

    let mut pipeline = silent_pipeline(&settings);
    let mut peak = 0.0f32;
    for _ in 0..30 {
        let node = pipeline.tick(&settings, 1.0 / 60.0);
        for vertex in &node.parts[0].geometry.vertices {
            peak = peak.max(vertex.position[1].abs());
            assert!(vertex.position[1].abs() <= 0.5 + 1e-5);
        }
    }
    assert!(peak > 0.4, "silent wave should still swing near ±0.5");
}

#[test]
fn glitch_offset_is_zero_or_banded() {
    let mut settings = VisualizerSettings::default();
    let mut pipeline = silent_pipeline(&settings);

    // glitch_amount = 0: the contributed offset is exactly zero each frame
    for _ in 0..50 {
        assert_eq!(pipeline.tick(&settings, 1.0 / 60.0).glitch_offset, Vec2::ZERO);
    }

    // glitch_amount = g: every draw lies in [-0.05 g, 0.05 g]
    settings.glitch_amount = 0.8;
    let bound = 0.05 * settings.glitch_amount;
    for _ in 0..300 {
        let offset = pipeline.tick(&settings, 1.0 / 60.0).glitch_offset;
        assert!(offset.x.abs() <= bound + 1e-7);
        assert!(offset.y.abs() <= bound + 1e-7);
    }
}

#[test]
fn particle_burst_never_escapes_the_overflow_radius() {
    let mut settings = VisualizerSettings::default();
    settings.style = StyleKind::ParticleBurst;
    settings.intensity = 1.0;
    settings.speed = 1.0;

    // Loud signal keeps the burst expanding at full gain
    let samples: Vec<f32> = (0..8192).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
    let mut pipeline =
        VisualizerPipeline::with_tap(tap_with(samples), 44100, &settings).unwrap();

    for _ in 0..500 {
        let node = pipeline.tick(&settings, 1.0 / 60.0);
        for vertex in &node.parts[0].geometry.vertices {
            let distance = (vertex.position[0].powi(2)
                + vertex.position[1].powi(2)
                + vertex.position[2].powi(2))
            .sqrt();
            assert!(distance <= 3.0 + 1e-4);
        }
    }
}

#[test]
fn structural_change_is_a_full_recreation() {
    let mut settings = VisualizerSettings::default();
    settings.style = StyleKind::Particles;
    settings.particle_count = 8;

    let mut pipeline = silent_pipeline(&settings);
    pipeline.tick(&settings, 1.0 / 60.0);
    assert_eq!(pipeline.node().parts.len(), 8);

    // Changing particle count mid-animation rebuilds the instance
    settings.particle_count = 32;
    pipeline.tick(&settings, 1.0 / 60.0);
    assert_eq!(pipeline.node().parts.len(), 32);

    // Grid density behaves the same way
    settings.style = StyleKind::Grid;
    pipeline.tick(&settings, 1.0 / 60.0);
    assert_eq!(pipeline.node().parts.len(), 16 * 16);
}

#[test]
fn cancelled_loop_never_touches_disposed_resources() {
    let settings = VisualizerSettings::default();
    let mut pipeline = silent_pipeline(&settings);
    let mut scheduler = FrameScheduler::new();

    let handle = scheduler.start().unwrap();
    assert!(scheduler.begin_tick(handle));
    pipeline.tick(&settings, 1.0 / 60.0);

    // Teardown cancels the loop before releasing anything
    lifecycle::teardown(&mut scheduler, Some(&mut pipeline), None);

    // A frame delivered late must be gated out entirely
    assert!(!scheduler.begin_tick(handle));
    assert!(pipeline.is_disposed());
    assert!(!pipeline.analyzer().is_connected());

    // Even a rogue tick against the disposed pipeline stays inert
    let node = pipeline.tick(&settings, 1.0 / 60.0);
    assert!(node.parts.is_empty());
}

#[test]
fn teardown_twice_is_safe() {
    let settings = VisualizerSettings::default();
    let mut pipeline = silent_pipeline(&settings);
    let mut scheduler = FrameScheduler::new();
    scheduler.start().unwrap();

    lifecycle::teardown(&mut scheduler, Some(&mut pipeline), None);
    lifecycle::teardown(&mut scheduler, Some(&mut pipeline), None);
    assert!(pipeline.is_disposed());
}

#[test]
fn analyzer_feeds_loud_signal_into_style_motion() {
    // A loud low-frequency tone must visibly scale the Default cube
    let sr = 44100.0;
    let samples: Vec<f32> = (0..16384)
        .map(|i| (2.0 * std::f32::consts::PI * 180.0 * i as f32 / sr).sin() * 0.9)
        .collect();

    let mut settings = VisualizerSettings::default();
    settings.intensity = 1.0;
    settings.speed = 0.0;
    settings.smoothing = 0.0;

    let mut pipeline =
        VisualizerPipeline::with_tap(tap_with(samples), 44100, &settings).unwrap();
    let node = pipeline.tick(&settings, 1.0 / 60.0);

    // bass bin is hot, so scale = 1 + bass*0.5 > 1
    assert!(node.transform.scale.x > 1.0);
    assert_eq!(node.transform.scale.x, node.transform.scale.y);
    assert_eq!(node.transform.scale.y, node.transform.scale.z);
}
