use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use careflow::workflows::onboarding::{
    InMemoryDirectory, InMemoryProgressRepository, OnboardingService, RecordingAuditSink,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ApiOnboardingService =
    OnboardingService<InMemoryDirectory, InMemoryProgressRepository, RecordingAuditSink>;

/// The storage seams behind a service, kept so the demo can inspect state
/// after a submission lands (or rolls back).
pub(crate) struct Backing {
    pub(crate) directory: Arc<InMemoryDirectory>,
    pub(crate) audit: Arc<RecordingAuditSink>,
}

pub(crate) fn onboarding_service() -> (Arc<ApiOnboardingService>, Backing) {
    let directory = Arc::new(InMemoryDirectory::new());
    let progress = Arc::new(InMemoryProgressRepository::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let service = Arc::new(OnboardingService::new(
        directory.clone(),
        progress,
        audit.clone(),
    ));
    (service, Backing { directory, audit })
}
