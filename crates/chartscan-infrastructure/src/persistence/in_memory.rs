use chartscan_domain::entities::scan::{Scan, ScanId};
use chartscan_domain::entities::scan_result::ScanResultRow;
use chartscan_domain::errors::ScanError;
use chartscan_domain::repositories::scan::{
    ScanRepository, ScanResultRepository, UnitOfWork, UnitOfWorkFactory,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-local scan store. Stands in for real persistence behind the
/// repository ports; the unit of work stages writes and applies them under
/// one lock so a scan's rows and terminal status become visible together.
#[derive(Default)]
pub struct InMemoryScanStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    scans: BTreeMap<ScanId, Scan>,
    rows: Vec<ScanResultRow>,
}

impl InMemoryScanStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, ScanError> {
        self.inner
            .lock()
            .map_err(|_| ScanError::Infrastructure("scan store lock poisoned".to_string()))
    }

    pub fn rows_for_scan(&self, scan_id: &ScanId) -> Result<Vec<ScanResultRow>, ScanError> {
        let inner = self.lock()?;
        Ok(inner
            .rows
            .iter()
            .filter(|row| &row.scan_id == scan_id)
            .cloned()
            .collect())
    }
}

impl ScanRepository for InMemoryScanStore {
    fn create(&self, scan: &Scan) -> Result<(), ScanError> {
        let mut inner = self.lock()?;
        if inner.scans.contains_key(&scan.scan_id) {
            return Err(ScanError::InvalidInput(format!(
                "scan already exists: {}",
                scan.scan_id
            )));
        }
        inner.scans.insert(scan.scan_id.clone(), scan.clone());
        Ok(())
    }

    fn get_by_scan_id(&self, scan_id: &ScanId) -> Result<Option<Scan>, ScanError> {
        let inner = self.lock()?;
        Ok(inner.scans.get(scan_id).cloned())
    }

    fn update(&self, scan: &Scan) -> Result<(), ScanError> {
        let mut inner = self.lock()?;
        if !inner.scans.contains_key(&scan.scan_id) {
            return Err(ScanError::not_found("scan", scan.scan_id.as_str()));
        }
        inner.scans.insert(scan.scan_id.clone(), scan.clone());
        Ok(())
    }
}

pub struct InMemoryUnitOfWorkFactory {
    store: Arc<InMemoryScanStore>,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new(store: Arc<InMemoryScanStore>) -> Self {
        Self { store }
    }
}

impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, ScanError> {
        Ok(Box::new(InMemoryUnitOfWork {
            store: Arc::clone(&self.store),
            staged: Mutex::new(Staged::default()),
        }))
    }
}

#[derive(Default)]
struct Staged {
    rows: Vec<ScanResultRow>,
    scan: Option<Scan>,
}

/// Staging transaction over the in-memory store. Writes are buffered until
/// `commit`; dropping the unit of work discards everything staged.
pub struct InMemoryUnitOfWork {
    store: Arc<InMemoryScanStore>,
    staged: Mutex<Staged>,
}

impl InMemoryUnitOfWork {
    fn stage(&self) -> Result<MutexGuard<'_, Staged>, ScanError> {
        self.staged
            .lock()
            .map_err(|_| ScanError::Infrastructure("unit of work lock poisoned".to_string()))
    }
}

impl ScanRepository for InMemoryUnitOfWork {
    fn create(&self, scan: &Scan) -> Result<(), ScanError> {
        self.stage()?.scan = Some(scan.clone());
        Ok(())
    }

    fn get_by_scan_id(&self, scan_id: &ScanId) -> Result<Option<Scan>, ScanError> {
        self.store.get_by_scan_id(scan_id)
    }

    fn update(&self, scan: &Scan) -> Result<(), ScanError> {
        self.stage()?.scan = Some(scan.clone());
        Ok(())
    }
}

impl ScanResultRepository for InMemoryUnitOfWork {
    fn bulk_insert(&self, rows: &[ScanResultRow]) -> Result<usize, ScanError> {
        let mut staged = self.stage()?;
        staged.rows.extend_from_slice(rows);
        Ok(rows.len())
    }
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn scans(&self) -> &dyn ScanRepository {
        self
    }

    fn scan_results(&self) -> &dyn ScanResultRepository {
        self
    }

    fn commit(self: Box<Self>) -> Result<(), ScanError> {
        let staged = self
            .staged
            .into_inner()
            .map_err(|_| ScanError::Infrastructure("unit of work lock poisoned".to_string()))?;
        let mut inner = self.store.lock()?;
        // validate before mutating so a failed commit leaves nothing behind
        if let Some(scan) = &staged.scan {
            if !inner.scans.contains_key(&scan.scan_id) {
                return Err(ScanError::not_found("scan", scan.scan_id.as_str()));
            }
        }
        inner.rows.extend(staged.rows);
        if let Some(scan) = staged.scan {
            inner.scans.insert(scan.scan_id.clone(), scan);
        }
        tracing::debug!("unit of work committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscan_domain::entities::scan::ScanStatus;
    use chartscan_domain::services::dataset::DataRequirements;
    use chartscan_domain::services::universe::UniverseDef;
    use chartscan_domain::value_objects::score::Score;
    use chartscan_domain::value_objects::ticker::Ticker;

    fn scan(id: &str) -> Scan {
        Scan::new(
            ScanId::new(id).unwrap(),
            UniverseDef::Explicit { symbols: vec![] },
            DataRequirements::daily(10),
            None,
        )
    }

    fn row(scan_id: &ScanId, ticker: &str) -> ScanResultRow {
        ScanResultRow {
            scan_id: scan_id.clone(),
            ticker: Ticker::parse(ticker).unwrap(),
            overall: Score::clamped(50.0),
            detector_scores: BTreeMap::new(),
            patterns_present: vec![],
            evidence: serde_json::Value::Null,
        }
    }

    #[test]
    fn create_rejects_duplicates_and_update_requires_existence() {
        let store = InMemoryScanStore::new();
        let scan = scan("scan-1");
        store.create(&scan).unwrap();
        assert!(store.create(&scan).is_err());
        assert!(store.update(&scan).is_ok());
        assert!(matches!(
            store.update(&self::scan("scan-2")),
            Err(ScanError::NotFound { .. })
        ));
    }

    #[test]
    fn commit_applies_rows_and_status_together() {
        let store = InMemoryScanStore::new();
        let mut scan = scan("scan-1");
        store.create(&scan).unwrap();
        scan.transition(ScanStatus::Running).unwrap();
        store.update(&scan).unwrap();

        let factory = InMemoryUnitOfWorkFactory::new(Arc::clone(&store));
        let uow = factory.begin().unwrap();
        uow.scan_results()
            .bulk_insert(&[row(&scan.scan_id, "AAPL"), row(&scan.scan_id, "MSFT")])
            .unwrap();
        scan.transition(ScanStatus::Completed).unwrap();
        uow.scans().update(&scan).unwrap();

        // nothing visible before commit
        assert!(store.rows_for_scan(&scan.scan_id).unwrap().is_empty());
        uow.commit().unwrap();
        assert_eq!(store.rows_for_scan(&scan.scan_id).unwrap().len(), 2);
        let stored = store.get_by_scan_id(&scan.scan_id).unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Completed);
    }

    #[test]
    fn dropping_without_commit_rolls_back() {
        let store = InMemoryScanStore::new();
        let scan = scan("scan-1");
        store.create(&scan).unwrap();

        let factory = InMemoryUnitOfWorkFactory::new(Arc::clone(&store));
        {
            let uow = factory.begin().unwrap();
            uow.scan_results()
                .bulk_insert(&[row(&scan.scan_id, "AAPL")])
                .unwrap();
            // dropped here without commit
        }
        assert!(store.rows_for_scan(&scan.scan_id).unwrap().is_empty());
    }

    #[test]
    fn commit_against_a_missing_scan_applies_nothing() {
        let store = InMemoryScanStore::new();
        let factory = InMemoryUnitOfWorkFactory::new(Arc::clone(&store));
        let ghost = scan("ghost");
        let uow = factory.begin().unwrap();
        uow.scan_results()
            .bulk_insert(&[row(&ghost.scan_id, "AAPL")])
            .unwrap();
        uow.scans().update(&ghost).unwrap();
        assert!(uow.commit().is_err());
        assert!(store.rows_for_scan(&ghost.scan_id).unwrap().is_empty());
    }
}
