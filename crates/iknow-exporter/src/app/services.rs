use std::sync::Arc;

use crate::exporter::Exporter;
use crate::metrics::IknowMetrics;
use crate::scheduler::Scheduler;

/// Application dependencies - simple struct with Arc-wrapped services
pub struct ApplicationServices {
    pub metrics: Arc<IknowMetrics>,
    pub exporter: Arc<Exporter>,
    pub scheduler: Arc<Scheduler>,
}
