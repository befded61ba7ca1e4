//! Feature-file execution through the cucumber [`EcuWorld`].

use cucumber::{writer::Stats, World as _};
use futures::FutureExt as _;
use std::path::PathBuf;

use crate::client::RoscoClient;
use crate::world::EcuWorld;

/// Step counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub parsing_errors: usize,
    pub hook_errors: usize,
}

impl RunSummary {
    /// True when every step ran and passed.
    pub fn succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && self.parsing_errors == 0 && self.hook_errors == 0
    }
}

/// Run the feature files under `features` against the service `client` targets.
///
/// Scenarios run one at a time, each with a fresh world holding a clone of
/// `client`. Steps with no matching binding count as failures.
pub async fn run_features(features: impl Into<PathBuf>, client: RoscoClient) -> RunSummary {
    let features = features.into();
    tracing::info!(
        features = %features.display(),
        service = %client.base_url(),
        "running feature files"
    );

    let writer = EcuWorld::cucumber()
        .max_concurrent_scenarios(1)
        .fail_on_skipped()
        .before(move |_, _, _, world| {
            world.set_client(client.clone());
            async {}.boxed_local()
        })
        .with_default_cli()
        .run(features)
        .await;

    let summary = RunSummary {
        passed: writer.passed_steps(),
        skipped: writer.skipped_steps(),
        failed: writer.failed_steps(),
        parsing_errors: writer.parsing_errors(),
        hook_errors: writer.hook_errors(),
    };
    tracing::info!(?summary, "feature run finished");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_verdict() {
        let ok = RunSummary {
            passed: 5,
            ..Default::default()
        };
        assert!(ok.succeeded());

        let skipped = RunSummary {
            passed: 4,
            skipped: 1,
            ..Default::default()
        };
        assert!(!skipped.succeeded());
    }
}
