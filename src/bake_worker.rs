//! Banded bake worker pool for interactive tooling.
//!
//! A bake is split into bands of rows. Bands are queued on a bounded crossbeam
//! channel shared by every caller of the pool and processed in batches on the
//! rayon pool. Each request carries its own reply sender, so finished bands go
//! straight back to the bake that asked for them, whichever thread computed
//! them. Callers poll replies themselves (once per editor frame) or wait for a
//! whole bake via [`bake_in_bands`].

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{TerrainError, TerrainResult};
use crate::row_kernel::{compute_band, CancelToken, RowKernel};
use crate::weight_grid::WeightGrid;

/// Fraction of detected CPUs to use for bake worker threads (numerator).
const THREAD_CPU_NUMERATOR: usize = 3;
/// Fraction of detected CPUs to use for bake worker threads (denominator).
const THREAD_CPU_DENOMINATOR: usize = 4;
/// Minimum number of bake worker threads.
const MIN_WORKER_THREADS: usize = 2;
/// Minimum batch size for processing band requests.
const MIN_BATCH_SIZE: usize = 16;
/// Default channel capacity for the band request channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;
/// Default number of rows per band.
pub const DEFAULT_BAND_ROWS: usize = 16;
/// How long a bake waits for a band computed by another caller before
/// re-checking cancellation and the request queue.
const RESULT_WAIT: Duration = Duration::from_millis(10);

/// Any row kernel that can be shipped to a worker
pub type SharedKernel = Arc<dyn RowKernel + Send>;

/// Request sent from a caller to workers
pub struct BandRequest {
    pub job_id: u64,
    pub start_row: usize,
    pub row_count: usize,
    pub kernel: SharedKernel,
    /// Where the finished band goes. Must have room for every band of the
    /// job, or workers block until the caller drains it.
    pub reply: Sender<BandResult>,
    /// Requests whose token is set are dropped without computing
    pub cancel: Option<CancelToken>,
}

/// Finished rows for one band, row-major, `row_count * row_len` floats
#[derive(Debug)]
pub struct BandResult {
    pub job_id: u64,
    pub start_row: usize,
    pub row_count: usize,
    pub data: Vec<f32>,
}

/// Worker pool for banded bakes. Safe to share between threads; any caller
/// may process any other caller's queued bands.
pub struct BakeWorkerPool {
    thread_count: usize,
    channel_capacity: usize,
    request_tx: Sender<BandRequest>,
    request_rx: Receiver<BandRequest>,
}

impl BakeWorkerPool {
    pub fn new(num_threads: usize, channel_capacity: usize) -> Self {
        let detected_cpus = num_cpus::get();
        let threads = if num_threads == 0 {
            ((detected_cpus * THREAD_CPU_NUMERATOR) / THREAD_CPU_DENOMINATOR)
                .max(MIN_WORKER_THREADS)
        } else {
            num_threads
        };
        let channel_capacity = channel_capacity.max(1);

        let (request_tx, request_rx) = bounded(channel_capacity);

        Self {
            thread_count: threads,
            channel_capacity,
            request_tx,
            request_rx,
        }
    }

    pub fn request_sender(&self) -> Sender<BandRequest> {
        self.request_tx.clone()
    }

    /// Take up to one batch of queued bands and compute them in parallel.
    /// Returns the number of requests taken off the queue, including
    /// cancelled ones that were dropped.
    pub fn process_requests(&self) -> usize {
        let batch_size = rayon::current_num_threads().max(MIN_BATCH_SIZE);
        let mut batch = Vec::with_capacity(batch_size);

        while batch.len() < batch_size {
            match self.request_rx.try_recv() {
                Ok(req) => batch.push(req),
                Err(_) => break,
            }
        }

        let processed = batch.len();
        if processed == 0 {
            return 0;
        }

        rayon::scope(|scope| {
            for request in batch {
                if request.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                    continue;
                }
                scope.spawn(move |_| {
                    let result = compute_band_request(&request);
                    if request.reply.send(result).is_err() {
                        log::debug!("band for job {} dropped: bake gone", request.job_id);
                    }
                });
            }
        });

        processed
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn pending_requests(&self) -> usize {
        self.request_rx.len()
    }

    /// Drop every queued request, whoever sent it
    pub fn clear(&self) {
        while self.request_rx.try_recv().is_ok() {}
    }

    pub fn shutdown(&mut self) {
        self.clear();
    }
}

impl Default for BakeWorkerPool {
    fn default() -> Self {
        Self::new(0, DEFAULT_CHANNEL_CAPACITY)
    }
}

fn compute_band_request(request: &BandRequest) -> BandResult {
    let data = compute_band(request.kernel.as_ref(), request.start_row, request.row_count);
    let row_len = request.kernel.row_len();
    BandResult {
        job_id: request.job_id,
        start_row: request.start_row,
        row_count: if row_len == 0 { 0 } else { data.len() / row_len },
        data,
    }
}

/// Split `rows` into `(start_row, row_count)` bands of at most `band_rows`.
pub fn split_into_bands(rows: usize, band_rows: usize) -> Vec<(usize, usize)> {
    let band_rows = band_rows.max(1);
    (0..rows)
        .step_by(band_rows)
        .map(|start| (start, band_rows.min(rows - start)))
        .collect()
}

/// Run a whole bake through the pool and wait for every band.
///
/// `layers` is the number of floats per cell (1 for heights). Bands are fed
/// in as queue capacity allows; cancellation is checked between batches.
/// Several bakes may share one pool from different threads.
pub fn bake_in_bands(
    pool: &BakeWorkerPool,
    kernel: SharedKernel,
    cols: usize,
    layers: usize,
    band_rows: usize,
    cancel: Option<&CancelToken>,
) -> TerrainResult<WeightGrid> {
    let rows = kernel.rows();
    if kernel.row_len() != cols * layers {
        return Err(TerrainError::ResolutionMismatch {
            expected: (rows, cols * layers),
            actual: (rows, kernel.row_len()),
        });
    }

    let mut grid = WeightGrid::new(rows, cols, layers);
    let bands = split_into_bands(rows, band_rows);
    let total = bands.len();
    let job_id = next_job_id();

    // One slot per band: workers never block on this job's replies
    let (reply_tx, reply_rx) = bounded(total.max(1));
    let sender = pool.request_sender();
    let batch_threshold = rayon::current_num_threads().max(MIN_BATCH_SIZE);
    let mut queued = bands.into_iter().map(|(start_row, row_count)| BandRequest {
        job_id,
        start_row,
        row_count,
        kernel: Arc::clone(&kernel),
        reply: reply_tx.clone(),
        cancel: cancel.cloned(),
    });
    let mut waiting: Option<BandRequest> = None;
    let mut received = 0;

    while received < total {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            log::info!("bake job {job_id} cancelled after {received}/{total} bands");
            return Err(TerrainError::Cancelled);
        }

        while let Some(request) = waiting.take().or_else(|| queued.next()) {
            match sender.try_send(request) {
                Ok(()) => {}
                Err(TrySendError::Full(request)) => {
                    waiting = Some(request);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(TerrainError::WorkerDisconnected);
                }
            }
            if pool.pending_requests() >= batch_threshold {
                break;
            }
        }

        let processed = pool.process_requests();
        let drained = drain_results(&reply_rx, &mut grid);
        received += drained;

        if processed == 0 && drained == 0 && received < total {
            // Remaining bands are being computed by another caller
            match reply_rx.recv_timeout(RESULT_WAIT) {
                Ok(result) => {
                    grid.write_rows(result.start_row, &result.data);
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TerrainError::WorkerDisconnected);
                }
            }
        }
    }

    log::debug!("bake job {job_id}: {total} bands assembled");
    Ok(grid)
}

/// Write every band already waiting on `receiver`; returns how many.
fn drain_results(receiver: &Receiver<BandResult>, grid: &mut WeightGrid) -> usize {
    let mut count = 0;
    while let Ok(result) = receiver.try_recv() {
        grid.write_rows(result.start_row, &result.data);
        count += 1;
    }
    count
}

fn next_job_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::LayerCompositor;
    use crate::group_weights::GroupWeightCurve;
    use crate::heightfield::HeightField;
    use crate::noise_field::{NoiseField, SharedNoiseSource};
    use crate::synthesizer::{synthesize, HeightfieldSettings, HeightfieldSynthesizer};
    use crate::texture_group::{TerrainGroup, TextureElement, TextureGroups};
    use std::thread;

    fn test_groups() -> TextureGroups {
        TextureGroups::new()
            .with(
                TerrainGroup::Sand,
                vec![
                    TextureElement::new("sand", 1.0).with_noise(6.0, [0.0, 0.0]),
                    TextureElement::new("shells", 0.5).with_noise(9.0, [40.0, 12.0]),
                ],
            )
            .with(TerrainGroup::Grass, vec![TextureElement::new("grass", 1.0)])
            .with(TerrainGroup::Rock, vec![TextureElement::new("rock", 1.0)])
            .with(TerrainGroup::Snow, vec![TextureElement::new("snow", 1.0)])
    }

    fn test_heights() -> Arc<HeightField> {
        let settings = HeightfieldSettings {
            width: 24,
            length: 24,
            ..Default::default()
        };
        Arc::new(synthesize(&NoiseField::new(42), &settings))
    }

    fn test_kernel(width: usize, height: usize) -> Arc<LayerCompositor<Arc<HeightField>, SharedNoiseSource>> {
        let noise: SharedNoiseSource = Arc::new(NoiseField::new(42));
        Arc::new(LayerCompositor::new(
            test_heights(),
            noise,
            width,
            height,
            GroupWeightCurve::default(),
            &test_groups(),
        ))
    }

    fn tall_settings() -> HeightfieldSettings {
        HeightfieldSettings {
            width: 64,
            length: 400,
            ..Default::default()
        }
    }

    #[test]
    fn test_worker_pool_creation() {
        let pool = BakeWorkerPool::new(2, 64);
        assert!(pool.thread_count() >= 1);
        assert_eq!(pool.channel_capacity(), 64);
    }

    #[test]
    fn test_worker_pool_default() {
        let pool = BakeWorkerPool::default();
        assert!(pool.thread_count() >= MIN_WORKER_THREADS);
    }

    #[test]
    fn test_thread_count_matches_requested() {
        let requested = 4;
        let pool = BakeWorkerPool::new(requested, 64);

        assert_eq!(
            pool.thread_count(),
            requested,
            "Thread count should match requested"
        );
    }

    #[test]
    fn test_split_into_bands() {
        assert_eq!(split_into_bands(10, 4), vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(split_into_bands(3, 0), vec![(0, 1), (1, 1), (2, 1)]);
        assert!(split_into_bands(0, 4).is_empty());
    }

    #[test]
    fn test_send_and_receive_band() {
        let pool = BakeWorkerPool::new(2, 64);
        let kernel: SharedKernel = test_kernel(8, 8);
        let (reply, results) = bounded(4);

        let request = BandRequest {
            job_id: 7,
            start_row: 2,
            row_count: 3,
            kernel: Arc::clone(&kernel),
            reply,
            cancel: None,
        };
        pool.request_sender()
            .send(request)
            .expect("Should send request");

        assert_eq!(pool.process_requests(), 1);

        let result = results
            .recv_timeout(Duration::from_secs(5))
            .expect("Should receive result");

        assert_eq!(result.job_id, 7);
        assert_eq!(result.start_row, 2);
        assert_eq!(result.row_count, 3);
        assert_eq!(result.data.len(), 3 * kernel.row_len());
    }

    #[test]
    fn test_cancelled_request_is_dropped() {
        let pool = BakeWorkerPool::new(2, 64);
        let kernel: SharedKernel = test_kernel(8, 8);
        let (reply, results) = bounded(4);
        let token = CancelToken::new();
        token.cancel();

        pool.request_sender()
            .send(BandRequest {
                job_id: 3,
                start_row: 0,
                row_count: 2,
                kernel,
                reply,
                cancel: Some(token),
            })
            .expect("Should send request");

        assert_eq!(pool.process_requests(), 1);
        assert!(results.try_recv().is_err(), "cancelled band must not be computed");
        assert_eq!(pool.pending_requests(), 0);
    }

    #[test]
    fn test_banded_paint_matches_direct_paint() {
        let pool = BakeWorkerPool::new(4, 64);
        let compositor = test_kernel(20, 37);
        let direct = compositor.paint();
        let layers = compositor.layer_set().len();

        let banded = bake_in_bands(&pool, compositor, 20, layers, 5, None).expect("bake should finish");
        assert_eq!(banded, direct, "banded bake must be bit-identical");
    }

    #[test]
    fn test_banded_heights_match_direct() {
        let pool = BakeWorkerPool::new(2, 4);
        let settings = HeightfieldSettings {
            width: 12,
            length: 30,
            ..Default::default()
        };
        let noise = NoiseField::new(8);
        let direct = synthesize(&noise, &settings);

        let kernel: SharedKernel = Arc::new(HeightfieldSynthesizer::new(noise, settings));
        let banded = bake_in_bands(&pool, kernel, settings.cols(), 1, 3, None).unwrap();
        assert_eq!(banded.as_slice(), direct.as_slice());
    }

    #[test]
    fn test_single_slot_queue_finishes() {
        let pool = BakeWorkerPool::new(1, 1);
        let settings = HeightfieldSettings {
            width: 8,
            length: 40,
            ..Default::default()
        };
        let noise = NoiseField::new(3);
        let direct = synthesize(&noise, &settings);

        let kernel: SharedKernel = Arc::new(HeightfieldSynthesizer::new(noise, settings));
        let banded = bake_in_bands(&pool, kernel, settings.cols(), 1, 1, None).unwrap();
        assert_eq!(banded.as_slice(), direct.as_slice());
    }

    #[test]
    fn test_two_bakes_share_one_pool() {
        let pool = Arc::new(BakeWorkerPool::new(2, 64));
        let settings = tall_settings();
        let (done_tx, done_rx) = bounded(2);

        for seed in [11, 12] {
            let pool = Arc::clone(&pool);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let kernel: SharedKernel =
                    Arc::new(HeightfieldSynthesizer::new(NoiseField::new(seed), settings));
                let result = bake_in_bands(&pool, kernel, settings.cols(), 1, 2, None);
                let _ = done_tx.send((seed, result));
            });
        }

        for _ in 0..2 {
            let (seed, result) = done_rx
                .recv_timeout(Duration::from_secs(60))
                .expect("concurrent bakes should both finish");
            let grid = result.expect("bake should succeed");
            let direct = synthesize(&NoiseField::new(seed), &settings);
            assert_eq!(grid.as_slice(), direct.as_slice(), "seed {} got foreign bands", seed);
        }
    }

    #[test]
    fn test_queued_cancelled_job_does_not_stall_others() {
        let pool = BakeWorkerPool::new(2, 64);
        let token = CancelToken::new();
        token.cancel();
        let (reply, stale) = bounded(8);
        let kernel: SharedKernel = test_kernel(8, 8);
        for start_row in 0..8 {
            pool.request_sender()
                .send(BandRequest {
                    job_id: 0,
                    start_row,
                    row_count: 1,
                    kernel: Arc::clone(&kernel),
                    reply: reply.clone(),
                    cancel: Some(token.clone()),
                })
                .unwrap();
        }

        let compositor = test_kernel(10, 9);
        let direct = compositor.paint();
        let layers = compositor.layer_set().len();
        let banded = bake_in_bands(&pool, compositor, 10, layers, 2, None).unwrap();
        assert_eq!(banded, direct);
        assert!(stale.try_recv().is_err());
    }

    #[test]
    fn test_cancelled_bake() {
        let pool = BakeWorkerPool::new(2, 64);
        let token = CancelToken::new();
        token.cancel();
        let compositor = test_kernel(8, 8);
        let layers = compositor.layer_set().len();
        let result = bake_in_bands(&pool, compositor, 8, layers, 2, Some(&token));
        assert!(matches!(result, Err(TerrainError::Cancelled)));
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let pool = BakeWorkerPool::new(1, 8);
        let compositor = test_kernel(8, 8);
        let result = bake_in_bands(&pool, compositor, 9, 1, 2, None);
        assert!(matches!(result, Err(TerrainError::ResolutionMismatch { .. })));
    }

    #[test]
    fn test_bounded_channels_dont_block() {
        let pool = BakeWorkerPool::new(1, 64);
        let kernel: SharedKernel = test_kernel(4, 4);
        let (reply, _results) = bounded(1);

        let mut sent = 0;
        for i in 0..100 {
            let request = BandRequest {
                job_id: 1,
                start_row: i % 4,
                row_count: 1,
                kernel: Arc::clone(&kernel),
                reply: reply.clone(),
                cancel: None,
            };

            match pool.request_sender().try_send(request) {
                Ok(_) => sent += 1,
                Err(TrySendError::Full(_)) => break,
                Err(TrySendError::Disconnected(_)) => panic!("Channel disconnected"),
            }
        }

        assert!(sent <= 64, "Should stop at channel capacity");
        assert!(sent > 0, "Should have sent some requests");
    }
}
