pub mod aggregator;
pub mod context;
pub mod enricher;
pub mod export;
pub mod ledger;
pub mod overlay;
pub mod statement;
pub mod statements;

pub use aggregator::{CustomerSyncOutcome, FetchTask, RecordAggregator, SyncReport};
pub use context::{DetailCache, OrgContext, RecordStore, Workspace};
pub use export::{DocumentTable, ExportSource};
pub use overlay::{OverlayEdit, PresentationOverlay};
pub use statements::StatementService;
