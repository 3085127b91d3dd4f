use crate::entities::scan::{Scan, ScanId};
use crate::entities::scan_result::ScanResultRow;
use crate::errors::ScanError;

/// Scan metadata lifecycle port.
pub trait ScanRepository {
    fn create(&self, scan: &Scan) -> Result<(), ScanError>;
    fn get_by_scan_id(&self, scan_id: &ScanId) -> Result<Option<Scan>, ScanError>;
    fn update(&self, scan: &Scan) -> Result<(), ScanError>;
}

/// Bulk result persistence port. `bulk_insert` returns the count inserted
/// and must be atomic with the enclosing unit of work.
pub trait ScanResultRepository {
    fn bulk_insert(&self, rows: &[ScanResultRow]) -> Result<usize, ScanError>;
}

/// Transactional scope for finalizing a scan: all result rows and the
/// terminal status commit together or not at all. Dropping a unit of work
/// without calling `commit` rolls it back, so rollback runs on every exit
/// path including cancellation.
pub trait UnitOfWork {
    fn scans(&self) -> &dyn ScanRepository;
    fn scan_results(&self) -> &dyn ScanResultRepository;
    fn commit(self: Box<Self>) -> Result<(), ScanError>;
}

pub trait UnitOfWorkFactory {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, ScanError>;
}
