//! Worker lifecycle and concurrency tests for ImageVariations.
//!
//! Tests cover:
//! - Backpressure (queue depth bounded by the high-water mark)
//! - Shutdown (close right after construction, queue stops growing)
//! - Failure handling (undecodable files in both source modes)
//! - Worker count capping

mod common;
use common::{image_folder, small_config, write_images};
use image_variations::{ImageVariations, PipelineConfig, SourceMode};

use anyhow::Result;
use std::fs;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Joins the pipeline on a helper thread and reports whether it finished in time.
fn joins_within(variations: ImageVariations, limit: Duration) -> bool {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        variations.join();
        let _ = tx.send(());
    });
    rx.recv_timeout(limit).is_ok()
}

/// Polls until at least `depth` samples are queued or `limit` passes.
fn fills_to(variations: &ImageVariations, depth: usize, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while variations.queued() < depth {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    true
}

// ============================================================================
// 1. Backpressure
// ============================================================================

#[test]
fn test_queue_depth_bounded_without_consumer() -> Result<()> {
    let input = image_folder(6, 64, 64)?;
    let config = small_config(input.path(), 2, 3);
    let bound = config.high_water_mark() + 3;
    let variations = ImageVariations::new(config)?;

    let high_water = variations.config().high_water_mark();
    assert!(fills_to(&variations, high_water, Duration::from_secs(10)));
    for _ in 0..5 {
        thread::sleep(Duration::from_millis(20));
        let queued = variations.queued();
        assert!(queued <= bound, "queue grew to {} (bound {})", queued, bound);
    }

    assert!(joins_within(variations, Duration::from_secs(10)));
    Ok(())
}

#[test]
fn test_batch_larger_than_high_water_mark() -> Result<()> {
    let input = image_folder(4, 64, 64)?;
    let mut variations = ImageVariations::new(small_config(input.path(), 2, 2))?;

    // 3 × 2 = 6 samples at most before workers pause; a batch of 20 needs them resumed
    let batch = variations.get_batch(20)?;
    assert_eq!(batch.len(), 20);
    Ok(())
}

// ============================================================================
// 2. Shutdown
// ============================================================================

#[test]
fn test_close_immediately_after_construction() -> Result<()> {
    let input = image_folder(8, 64, 64)?;
    let variations = ImageVariations::new(small_config(input.path(), 4, 4))?;
    variations.close();
    assert!(variations.is_closed());
    assert!(joins_within(variations, Duration::from_secs(10)));
    Ok(())
}

#[test]
fn test_close_wakes_workers_paused_at_high_water_mark() -> Result<()> {
    let input = image_folder(2, 64, 64)?;
    let config = PipelineConfig {
        worker_timeout: Duration::from_secs(30),
        ..small_config(input.path(), 1, 2)
    };
    let variations = ImageVariations::new(config)?;
    assert!(fills_to(&variations, 3, Duration::from_secs(10)));
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    variations.close();
    assert!(joins_within(variations, Duration::from_secs(5)));
    assert!(start.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[test]
fn test_close_is_idempotent() -> Result<()> {
    let input = image_folder(2, 64, 64)?;
    let variations = ImageVariations::new(small_config(input.path(), 2, 2))?;
    variations.close();
    variations.close();
    assert!(joins_within(variations, Duration::from_secs(10)));
    Ok(())
}

#[test]
fn test_queue_stops_growing_after_close() -> Result<()> {
    let input = image_folder(4, 64, 64)?;
    let config = PipelineConfig {
        source_mode: SourceMode::Streaming,
        ..small_config(input.path(), 4, 2)
    };
    let mut variations = ImageVariations::new(config)?;
    variations.get_batch(2)?;

    variations.close();
    let at_close = variations.queued();

    // Leftovers can still be drained, then the pipeline reports that it is done.
    // Each worker finishes at most its in-flight sample.
    let mut drained = 0;
    let err = loop {
        match variations.get_batch(1) {
            Ok(_) => drained += 1,
            Err(e) => break e,
        }
        assert!(drained <= at_close + 2, "drained {} after close", drained);
    };
    assert!(err.to_string().contains("All workers have exited"));
    Ok(())
}

#[test]
fn test_drop_joins_workers() -> Result<()> {
    let input = image_folder(3, 64, 64)?;
    let (tx, rx) = mpsc::channel();
    let config = small_config(input.path(), 2, 3);
    thread::spawn(move || {
        let variations = ImageVariations::new(config);
        drop(variations);
        let _ = tx.send(());
    });
    assert!(rx.recv_timeout(Duration::from_secs(10)).is_ok());
    Ok(())
}

// ============================================================================
// 3. Failure handling
// ============================================================================

#[test]
fn test_corrupt_files_do_not_stop_streaming() -> Result<()> {
    let input = tempfile::tempdir()?;
    write_images(input.path(), 3, 64, 64)?;
    fs::write(input.path().join("broken_a.png"), b"garbage")?;
    fs::write(input.path().join("broken_b.jpg"), b"more garbage")?;

    let config = PipelineConfig {
        source_mode: SourceMode::Streaming,
        ..small_config(input.path(), 4, 1)
    };
    let mut variations = ImageVariations::new(config)?;
    for _ in 0..5 {
        assert_eq!(variations.get_batch(4)?.len(), 4);
    }
    Ok(())
}

#[test]
fn test_corrupt_files_dropped_at_preload() -> Result<()> {
    let input = tempfile::tempdir()?;
    write_images(input.path(), 2, 64, 64)?;
    fs::write(input.path().join("broken.png"), b"garbage")?;

    let mut variations = ImageVariations::new(small_config(input.path(), 4, 1))?;
    assert_eq!(variations.get_batch(8)?.len(), 8);
    Ok(())
}

#[test]
fn test_all_files_corrupt_reports_dead_pipeline() -> Result<()> {
    let input = tempfile::tempdir()?;
    fs::write(input.path().join("a.png"), b"garbage")?;
    fs::write(input.path().join("b.png"), b"garbage")?;

    // Construction succeeds: files are only decoded by the workers
    let mut variations = ImageVariations::new(small_config(input.path(), 2, 2))?;
    let err = variations.get_batch(1).unwrap_err();
    assert!(err.to_string().contains("All workers have exited"));
    Ok(())
}

// ============================================================================
// 4. Worker count
// ============================================================================

#[test]
fn test_workers_capped_at_file_count() -> Result<()> {
    let input = image_folder(2, 64, 64)?;
    let variations = ImageVariations::new(small_config(input.path(), 2, 16))?;
    assert_eq!(variations.num_workers(), 2);
    Ok(())
}

#[test]
fn test_default_worker_count_is_positive() -> Result<()> {
    let input = image_folder(64, 40, 40)?;
    let config = PipelineConfig {
        num_workers: None,
        ..small_config(input.path(), 2, 1)
    };
    let variations = ImageVariations::new(config)?;
    assert!(variations.num_workers() >= 1);
    assert!(variations.num_workers() <= 64);
    Ok(())
}
