pub mod classification;
pub mod discovery;
pub mod orchestrator;
pub mod scheduler;
pub mod seed_list;

pub use classification::ClassificationEngine;
pub use discovery::{DiscoveryEngine, DiscoveryResult};
pub use orchestrator::{MaintenanceConfig, MaintenanceReport, Orchestrator, RefreshEvent, RefreshSummary};
pub use scheduler::{run_scheduler, RefreshRequest, SchedulerConfig};
pub use seed_list::{SeedList, SeedLoadError};
