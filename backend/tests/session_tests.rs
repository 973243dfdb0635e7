//! Recommendation session tests
//!
//! Drives sessions end to end against in-memory climate and identification
//! fakes: input ordering, degradation, failure, cancellation, idempotence.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use crop_advisor::error::AppError;
use crop_advisor::services::{RecommendationSession, SessionRegistry};
use shared::{SessionFailure, SessionState, SessionStatus};
use tokio_test::{assert_err, assert_ok};

fn session(climate: Arc<FakeClimateSource>, identifier: Arc<FakeIdentifier>) -> RecommendationSession {
    RecommendationSession::new(context(climate, identifier))
}

// =============================================================================
// Happy Path
// =============================================================================

mod completion {
    use super::*;

    #[tokio::test]
    async fn location_and_photo_produce_top_three() {
        let identifier = FakeIdentifier::identifies("Zea mays", 0.9);
        let s = session(FakeClimateSource::healthy(reading()), identifier.clone());

        assert_eq!(s.submit_location(location()).unwrap(), SessionStatus::AwaitingInputs);
        assert_eq!(s.submit_photo(photo()).unwrap(), SessionStatus::AwaitingInputs);

        let results = s.run().await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].crop_name, "Maize");
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].factors.identification, 90);
        assert_eq!(identifier.calls(), 1);

        let view = s.view();
        assert_eq!(view.status, SessionStatus::Complete);
        assert_eq!(view.plant_hint.unwrap().species_guess, "Zea mays");
        assert_eq!(view.result_count, 8);
    }

    #[tokio::test]
    async fn inputs_in_either_order_give_same_results() {
        let a = session(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::identifies("corn", 0.7),
        );
        a.submit_location(location()).unwrap();
        a.submit_photo(photo()).unwrap();

        let b = session(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::identifies("corn", 0.7),
        );
        b.submit_photo(photo()).unwrap();
        b.submit_location(location()).unwrap();

        let (ra, rb) = tokio::join!(a.run_full(), b.run_full());
        let (ra, rb) = (ra.unwrap(), rb.unwrap());
        let names = |r: &[shared::CropRecommendation]| {
            r.iter()
                .map(|c| (c.crop_name.clone(), c.confidence))
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&ra), names(&rb));
    }

    #[tokio::test(start_paused = true)]
    async fn photo_arriving_while_run_waits_is_used() {
        let s = Arc::new(session(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::identifies("Oryza sativa", 0.95),
        ));
        s.submit_location(location()).unwrap();

        let runner = tokio::spawn({
            let s = s.clone();
            async move { s.run_full().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        s.submit_photo(photo()).unwrap();

        let results = runner.await.unwrap().unwrap();
        let rice = results.iter().find(|r| r.crop_name == "Rice").unwrap();
        assert_eq!(rice.factors.identification, 95);
    }

    #[tokio::test(start_paused = true)]
    async fn location_only_proceeds_after_input_wait() {
        let identifier = FakeIdentifier::identifies("Zea mays", 0.9);
        let s = session(FakeClimateSource::healthy(reading()), identifier.clone());
        s.submit_location(location()).unwrap();

        let start = tokio::time::Instant::now();
        let results = s.run().await.unwrap();

        assert!(start.elapsed() >= settings().input_wait);
        assert_eq!(results[0].factors.identification, 0);
        assert_eq!(identifier.calls(), 0);
        assert!(s.view().plant_hint.is_none());
    }

    #[tokio::test]
    async fn run_full_returns_whole_catalog() {
        let s = session(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::unidentified(),
        );
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        let full = s.run_full().await.unwrap();
        assert_eq!(full.len(), knowledge().crops.len());
        let top = s.run().await.unwrap();
        assert_eq!(&full[..3], &top[..]);
    }
}

// =============================================================================
// Degradation and Failure
// =============================================================================

mod failure {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn identification_timeout_still_completes() {
        let s = session(FakeClimateSource::healthy(reading()), FakeIdentifier::hanging());
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        let results = s.run().await.unwrap();
        assert_eq!(s.status(), SessionStatus::Complete);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.factors.identification == 0));
    }

    #[tokio::test]
    async fn identification_error_still_completes() {
        let s = session(FakeClimateSource::healthy(reading()), FakeIdentifier::failing());
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        assert!(s.run().await.is_ok());
        assert_eq!(s.status(), SessionStatus::Complete);
        assert!(s.view().plant_hint.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn climate_outage_fails_session_without_scoring() {
        let climate = FakeClimateSource::unavailable();
        let s = session(climate.clone(), FakeIdentifier::identifies("corn", 0.9));
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        let result = s.run().await;
        assert!(matches!(result, Err(AppError::ClimateUnavailable(_))));
        assert_eq!(climate.calls(), 3);

        let view = s.view();
        assert_eq!(view.status, SessionStatus::Failed);
        assert!(matches!(
            view.failure,
            Some(SessionFailure::ClimateUnavailable { .. })
        ));
        assert_eq!(view.result_count, 0);
        assert!(view.climate.is_none());
    }

    #[tokio::test]
    async fn invalid_climate_fails_session() {
        let mut bad = reading();
        bad.ndvi = 3.0;
        let s = session(FakeClimateSource::healthy(bad), FakeIdentifier::unidentified());
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        assert!(matches!(s.run().await, Err(AppError::ClimateDataInvalid(_))));
        assert!(matches!(
            s.state(),
            SessionState::Failed(SessionFailure::ClimateDataInvalid { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn run_without_location_is_rejected() {
        let s = session(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::unidentified(),
        );
        s.submit_photo(photo()).unwrap();

        let result = s.run().await;
        assert!(matches!(result, Err(AppError::Validation { ref field, .. }) if field == "location"));
        // The photo is kept so the farmer can still add a location
        assert_eq!(s.status(), SessionStatus::AwaitingInputs);
        assert!(s.view().has_photo);
    }

    #[tokio::test]
    async fn invalid_photo_rejected_at_submission() {
        let s = session(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::unidentified(),
        );
        let mut bad = photo();
        bad.image_base64 = "%%%".into();
        assert!(matches!(s.submit_photo(bad), Err(AppError::Validation { .. })));
        assert_eq!(s.status(), SessionStatus::Pending);
    }
}

// =============================================================================
// Cancellation
// =============================================================================

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn cancelled_before_run_delivers_nothing() {
        let climate = FakeClimateSource::healthy(reading());
        let s = session(climate.clone(), FakeIdentifier::unidentified());
        s.submit_location(location()).unwrap();
        s.cancel().unwrap();

        assert!(matches!(s.run().await, Err(AppError::SessionCancelled(_))));
        assert_eq!(climate.calls(), 0);
        assert!(s.state().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_scoring_discards_results() {
        let climate = FakeClimateSource::slow(reading(), Duration::from_secs(10));
        let s = Arc::new(session(climate.clone(), FakeIdentifier::unidentified()));
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        let runner = tokio::spawn({
            let s = s.clone();
            async move { s.run().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(s.status(), SessionStatus::Scoring);

        s.cancel().unwrap();
        let result = runner.await.unwrap();

        assert!(matches!(result, Err(AppError::SessionCancelled(_))));
        assert!(s.state().is_cancelled());
        assert_eq!(s.view().result_count, 0);
        // A later run still refuses to deliver
        assert!(matches!(s.run().await, Err(AppError::SessionCancelled(_))));
    }

    #[tokio::test]
    async fn inputs_rejected_after_cancel() {
        let s = session(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::unidentified(),
        );
        s.cancel().unwrap();
        s.cancel().unwrap();
        assert!(matches!(
            s.submit_location(location()),
            Err(AppError::SessionCancelled(_))
        ));
    }
}

// =============================================================================
// Idempotence
// =============================================================================

mod idempotence {
    use super::*;

    #[tokio::test]
    async fn second_run_returns_stored_results() {
        let climate = FakeClimateSource::healthy(reading());
        let identifier = FakeIdentifier::identifies("cassava", 0.6);
        let s = session(climate.clone(), identifier.clone());
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        let first = s.run().await.unwrap();
        let second = s.run().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(climate.calls(), 1);
        assert_eq!(identifier.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_runs_share_one_scoring_pass() {
        let climate = FakeClimateSource::healthy(reading());
        let s = session(climate.clone(), FakeIdentifier::unidentified());
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        let (a, b) = tokio::join!(s.run(), s.run());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(climate.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_run_can_be_retried() {
        let climate = FakeClimateSource::slow(reading(), Duration::from_secs(10));
        let s = session(climate.clone(), FakeIdentifier::unidentified());
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();

        // Caller gives up mid-fetch and drops the run future
        assert_err!(tokio::time::timeout(Duration::from_secs(1), s.run()).await);
        assert_eq!(s.status(), SessionStatus::AwaitingInputs);
        assert!(s.view().has_photo);

        let results = assert_ok!(s.run().await);
        assert_eq!(results.len(), 3);
        assert_eq!(s.status(), SessionStatus::Complete);
        assert_eq!(climate.calls(), 2);
    }

    #[tokio::test]
    async fn inputs_locked_after_completion() {
        let s = session(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::unidentified(),
        );
        s.submit_location(location()).unwrap();
        s.submit_photo(photo()).unwrap();
        s.run().await.unwrap();

        assert!(matches!(
            s.submit_location(location()),
            Err(AppError::InvalidStateTransition(_))
        ));
    }
}

// =============================================================================
// Registry
// =============================================================================

mod registry {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(context(
            FakeClimateSource::healthy(reading()),
            FakeIdentifier::unidentified(),
        ))
    }

    #[tokio::test]
    async fn create_get_take() {
        let registry = registry();
        let session = registry.create().await;
        let id = session.id();

        assert_eq!(registry.get(id).await.unwrap().id(), id);
        assert_eq!(registry.len().await, 1);

        let taken = registry.take(id).await.unwrap();
        assert!(taken.state().is_cancelled());
        assert!(registry.is_empty().await);
        assert!(matches!(
            registry.get(id).await,
            Err(AppError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn taking_completed_session_keeps_results() {
        let registry = registry();
        let session = registry.create().await;
        session.submit_location(location()).unwrap();
        session.submit_photo(photo()).unwrap();
        session.run().await.unwrap();

        let taken = registry.take(session.id()).await.unwrap();
        assert_eq!(taken.status(), SessionStatus::Complete);
    }

    #[tokio::test]
    async fn prune_discards_old_sessions() {
        let registry = registry();
        let session = registry.create().await;

        assert_eq!(registry.prune(chrono::Duration::hours(1)).await, 0);
        assert_eq!(registry.prune(chrono::Duration::seconds(-1)).await, 1);
        assert!(session.state().is_cancelled());
    }
}
