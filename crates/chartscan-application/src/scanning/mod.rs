use crate::config::ScanConfig;
use crate::shared::{build_registry, build_scorer, build_signal_config};
use chartscan_domain::entities::scan::{Scan, ScanId, ScanStatus, ScanSummary, SkippedSymbol};
use chartscan_domain::entities::scan_result::ScanResultRow;
use chartscan_domain::errors::ScanError;
use chartscan_domain::repositories::market_data::StockDataProvider;
use chartscan_domain::repositories::scan::{ScanRepository, UnitOfWorkFactory};
use chartscan_domain::repositories::universe::UniverseRepository;
use chartscan_domain::services::dataset::SymbolDataset;
use chartscan_domain::services::detectors::PatternDetector;
use chartscan_domain::services::preparation::{self, PreparedBatch};
use chartscan_domain::services::scoring::CompositeScorer;
use chartscan_domain::services::signals::{self, SignalConfig};
use chartscan_domain::services::universe;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Cooperative cancellation flag for an in-flight scan. Per-symbol work is
/// pure and side-effect-free, so abandoning it is always safe; a cancelled
/// scan never reaches the final commit.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ports the orchestrator drives. Infrastructure adapters are injected by
/// the caller, never imported here.
pub struct ScanDeps<'a> {
    pub scans: &'a dyn ScanRepository,
    pub universe: &'a dyn UniverseRepository,
    pub provider: &'a dyn StockDataProvider,
    pub unit_of_work: &'a dyn UnitOfWorkFactory,
    pub cancellation: Option<&'a CancellationToken>,
}

/// Runs one scan end to end: pending -> running -> {completed, failed}.
///
/// Per-symbol data and detection failures are absorbed into the summary's
/// skip counts. Universe resolution and persistence failures are fatal: the
/// scan transitions to failed and the causal error propagates. All result
/// rows and the terminal status commit inside one unit of work.
pub fn run_scan(config: &ScanConfig, deps: &ScanDeps) -> Result<ScanSummary, ScanError> {
    // Fail fast on malformed input before any record exists.
    let scan_id = ScanId::new(&config.scan.scan_id)?;
    let universe_def = config.universe_def()?;
    let requirements = config.requirements()?;
    let policy = config.failure_policy()?;
    let registry = build_registry(config);
    let detectors = registry.resolve_active(&config.active_detectors())?;
    let scorer = build_scorer(config);
    let signal_config = build_signal_config(config);
    let require_non_empty = !config.universe.allow_empty.unwrap_or(false);

    let _span = info_span!(
        "run_scan",
        scan_id = %scan_id,
        universe = %universe_def.describe()
    )
    .entered();

    let mut scan = Scan::new(
        scan_id.clone(),
        universe_def.clone(),
        requirements.clone(),
        config.scan.feature_run_id.clone(),
    );
    deps.scans.create(&scan)?;
    scan.transition(ScanStatus::Running)?;
    if let Err(err) = deps.scans.update(&scan) {
        return Err(fail_scan(deps.scans, scan, err));
    }

    let started = Instant::now();

    let stage_start = Instant::now();
    let tickers = match universe::resolve(deps.universe, &universe_def, require_non_empty) {
        Ok(tickers) => tickers,
        Err(err) => return Err(fail_scan(deps.scans, scan, err)),
    };
    metrics::histogram!("chartscan.scan.resolve_universe_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    info!(resolved = tickers.len(), "universe resolved");

    let stage_start = Instant::now();
    let batch = match preparation::prepare_bulk(deps.provider, &tickers, &requirements, policy) {
        Ok(batch) => batch,
        Err(err) => return Err(fail_scan(deps.scans, scan, err)),
    };
    metrics::histogram!("chartscan.scan.prepare_data_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    for failure in &batch.failures {
        warn!(ticker = %failure.ticker, reason = %failure.reason, "symbol skipped during data preparation");
    }

    if is_cancelled(deps) {
        return Err(fail_scan(deps.scans, scan, ScanError::Cancelled));
    }

    let stage_start = Instant::now();
    let (rows, mut skipped) = match detect_and_score(
        config,
        deps.cancellation,
        &scan_id,
        &batch,
        &detectors,
        &scorer,
        &signal_config,
    ) {
        Ok(outcome) => outcome,
        Err(err) => return Err(fail_scan(deps.scans, scan, err)),
    };
    metrics::histogram!("chartscan.scan.detect_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let mut skipped_symbols = batch.failures;
    skipped_symbols.append(&mut skipped);
    let summary = ScanSummary {
        resolved: tickers.len(),
        scored: rows.len(),
        skipped: skipped_symbols.len(),
        duration_ms: started.elapsed().as_millis() as u64,
        skipped_symbols,
    };
    debug_assert_eq!(summary.resolved, summary.scored + summary.skipped);

    if is_cancelled(deps) {
        return Err(fail_scan(deps.scans, scan, ScanError::Cancelled));
    }

    let stage_start = Instant::now();
    if let Err(err) = finalize(deps, &mut scan, rows, &summary) {
        return Err(fail_scan(deps.scans, scan, err));
    }
    metrics::histogram!("chartscan.scan.persist_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    metrics::gauge!("chartscan.scan.symbols_scored").set(summary.scored as f64);
    metrics::gauge!("chartscan.scan.symbols_skipped").set(summary.skipped as f64);
    info!(
        scored = summary.scored,
        skipped = summary.skipped,
        duration_ms = summary.duration_ms,
        "scan completed"
    );
    Ok(summary)
}

fn is_cancelled(deps: &ScanDeps) -> bool {
    deps.cancellation.is_some_and(CancellationToken::is_cancelled)
}

/// Runs detectors and the composite scorer for every prepared dataset on a
/// bounded worker pool. Per-symbol work is read-only over shared state and
/// each symbol yields an independent row; this collect is the single merge
/// point for results.
#[allow(clippy::too_many_arguments)]
fn detect_and_score(
    config: &ScanConfig,
    cancellation: Option<&CancellationToken>,
    scan_id: &ScanId,
    batch: &PreparedBatch,
    detectors: &[Arc<dyn PatternDetector>],
    scorer: &CompositeScorer,
    signal_config: &SignalConfig,
) -> Result<(Vec<ScanResultRow>, Vec<SkippedSymbol>), ScanError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.concurrency())
        .build()
        .map_err(|err| ScanError::Infrastructure(format!("failed to build worker pool: {err}")))?;

    let outcomes: Vec<Result<ScanResultRow, SkippedSymbol>> = pool.install(|| {
        batch
            .datasets
            .par_iter()
            .map(|dataset| {
                if cancellation.is_some_and(CancellationToken::is_cancelled) {
                    return Err(SkippedSymbol {
                        ticker: dataset.ticker.clone(),
                        reason: "scan cancelled".to_string(),
                    });
                }
                score_symbol(scan_id, dataset, detectors, scorer, signal_config)
            })
            .collect()
    });

    let mut rows = Vec::with_capacity(outcomes.len());
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(row) => rows.push(row),
            Err(skip) => {
                warn!(ticker = %skip.ticker, reason = %skip.reason, "symbol skipped during detection");
                skipped.push(skip);
            }
        }
    }
    Ok((rows, skipped))
}

/// A detector blowing up on one symbol's data must never abort the batch;
/// the symbol is recorded as skipped with the reason instead.
fn score_symbol(
    scan_id: &ScanId,
    dataset: &SymbolDataset,
    detectors: &[Arc<dyn PatternDetector>],
    scorer: &CompositeScorer,
    signal_config: &SignalConfig,
) -> Result<ScanResultRow, SkippedSymbol> {
    let detections = catch_unwind(AssertUnwindSafe(|| {
        detectors
            .iter()
            .map(|detector| detector.detect(dataset))
            .collect::<Vec<_>>()
    }))
    .map_err(|payload| SkippedSymbol {
        ticker: dataset.ticker.clone(),
        reason: format!("detector panicked: {}", panic_message(&payload)),
    })?;

    let signals = signals::auxiliary_signals(dataset, signal_config);
    let overall = scorer.score(&detections, &signals);
    Ok(ScanResultRow::from_detections(
        scan_id.clone(),
        dataset.ticker.clone(),
        overall,
        &detections,
    ))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Commits all result rows and the terminal status in one transaction;
/// either everything for the scan becomes visible or nothing does. The
/// unit of work rolls back on drop if anything short-circuits.
fn finalize(
    deps: &ScanDeps,
    scan: &mut Scan,
    rows: Vec<ScanResultRow>,
    summary: &ScanSummary,
) -> Result<(), ScanError> {
    let mut completed = scan.clone();
    completed.transition(ScanStatus::Completed)?;
    completed.summary = Some(summary.clone());

    let uow = deps.unit_of_work.begin()?;
    let inserted = uow.scan_results().bulk_insert(&rows)?;
    if inserted != rows.len() {
        return Err(ScanError::Infrastructure(format!(
            "bulk insert wrote {inserted} of {} rows",
            rows.len()
        )));
    }
    uow.scans().update(&completed)?;
    uow.commit()?;

    *scan = completed;
    Ok(())
}

fn fail_scan(scans: &dyn ScanRepository, mut scan: Scan, err: ScanError) -> ScanError {
    if scan.transition(ScanStatus::Failed).is_ok() {
        if let Err(update_err) = scans.update(&scan) {
            warn!(
                scan_id = %scan.scan_id,
                error = %update_err,
                "failed to persist failed scan status"
            );
        }
    }
    err
}
