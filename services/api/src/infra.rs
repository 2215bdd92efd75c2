use guest_portal::config::{ScoringConfig, TokenGrant};
use guest_portal::workflows::leads::{
    Identity, IdentityError, IdentityProvider, PitchConfig, PitchConfigError, Role,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Bearer tokens fixed at startup.
#[derive(Debug, Default, Clone)]
pub(crate) struct StaticIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub(crate) fn from_grants<'a>(grants: impl IntoIterator<Item = &'a TokenGrant>) -> Self {
        let tokens = grants
            .into_iter()
            .map(|grant| {
                (
                    grant.token.clone(),
                    Identity::new(grant.uid.clone(), grant.role),
                )
            })
            .collect();
        Self { tokens }
    }

    /// One token per role, used by the demo and as a development fallback.
    pub(crate) fn demo() -> Self {
        let tokens = Role::ORDERED
            .into_iter()
            .map(|role| {
                (
                    format!("demo-{role}"),
                    Identity::new(format!("uid-demo-{role}"), role),
                )
            })
            .collect();
        Self { tokens }
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Rejected)
    }
}

/// Weight table from `PITCH_WEIGHTS_PATH`, or the canonical table when unset.
pub(crate) fn load_pitch_config(scoring: &ScoringConfig) -> Result<PitchConfig, PitchConfigError> {
    match &scoring.weights_path {
        Some(path) => {
            let config = PitchConfig::from_path(path)?;
            info!(
                path = %path.display(),
                fields = config.weights().len(),
                total = config.total_weight(),
                "loaded pitch weights"
            );
            Ok(config)
        }
        None => Ok(PitchConfig::canonical()),
    }
}
