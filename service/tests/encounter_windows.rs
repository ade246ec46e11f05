//! Encounter review windows: scheduling, closure and publication.

mod support;

use std::{future::IntoFuture as _, time::Duration};

use common::DateTime;
use service::{
    command::{
        start_session, submit_review, RecordEncounter, StartSession,
        SubmitReview,
    },
    domain::{
        encounter::{self, review, CloseReason},
        session::VaiDetails,
        user,
    },
    Command as _,
};

/// Records a fresh [`encounter::Encounter`] between two new users.
async fn encounter(
    svc: &support::TestService,
) -> (encounter::Encounter, user::Id, user::Id) {
    let provider_id = user::Id::new();
    let client_id = user::Id::new();
    let enc = svc
        .execute(RecordEncounter {
            verification_id: encounter::VerificationId::default(),
            provider_id,
            client_id,
        })
        .await
        .unwrap();
    (enc, provider_id, client_id)
}

/// Submits a five-star review on behalf of the provided reviewer.
async fn submit_five_star(
    svc: &support::TestService,
    encounter_id: encounter::Id,
    reviewer_id: user::Id,
) -> review::Review {
    svc.execute(SubmitReview {
        encounter_id,
        reviewer_id,
        rating: review::Rating::new(5).unwrap(),
        comment: review::Comment::new("lovely evening"),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn publication_is_scheduled_once_both_parties_review() {
    let (svc, db, _sms, _bg) = support::service();
    let (enc, provider_id, client_id) = encounter(&svc).await;

    let first = submit_five_star(&svc, enc.id, provider_id).await;
    assert!(first.published_at.is_none());
    assert!(db.state().encounters[&enc.id].publish_due_at.is_none());

    let second = submit_five_star(&svc, enc.id, client_id).await;
    assert!(second.published_at.is_none());
    assert!(db.state().encounters[&enc.id].publish_due_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn due_publication_closes_windows_and_publishes_reviews() {
    let (svc, db, _sms, bg) = support::service();
    let (enc, provider_id, client_id) = encounter(&svc).await;

    // A linked safety session with exposed identity details.
    support::monitored_user_with_id(&svc, provider_id, 0).await;
    let session = svc
        .execute(StartSession {
            user_id: provider_id,
            duration: Duration::from_secs(60 * 60),
            group_ids: vec![],
            encounter_id: Some(enc.id),
            vai_details: Some(VaiDetails::new("Alex R., verified").unwrap()),
        })
        .await
        .unwrap();

    let _ = submit_five_star(&svc, enc.id, provider_id).await;
    let _ = submit_five_star(&svc, enc.id, client_id).await;

    // A sweep before the scheduled publication leaves everything untouched.
    let mut bg = bg.into_future();
    let _ = tokio::time::timeout(Duration::from_secs(30 * 60), &mut bg).await;
    {
        let state = db.state();
        assert_eq!(
            state.encounters[&enc.id].status,
            encounter::Status::Accepted,
        );
        assert!(state.reviews.iter().all(|r| r.published_at.is_none()));
    }

    // Pull the scheduled publication into the past.
    db.tweak_encounter(enc.id, |e| {
        e.publish_due_at =
            Some((DateTime::now() - Duration::from_secs(60)).coerce());
    });

    let _ =
        tokio::time::timeout(Duration::from_secs(2 * 60 * 60), &mut bg).await;

    let state = db.state();
    let closed = &state.encounters[&enc.id];
    assert_eq!(closed.status, encounter::Status::Closed);
    assert_eq!(
        closed.reviews_window.reason(),
        Some(CloseReason::ReviewsPosted),
    );
    assert_eq!(
        closed.dateguard_window.reason(),
        Some(CloseReason::ReviewsPosted),
    );
    assert!(state.reviews.iter().all(|r| r.published_at.is_some()));

    // Exposed identity details of the linked session have expired.
    assert_eq!(
        state.sessions[&session.id].vai_details,
        Some(VaiDetails::expired()),
    );
}

#[tokio::test(start_paused = true)]
async fn deadline_closes_a_single_sided_encounter() {
    let (svc, db, _sms, bg) = support::service();
    let (enc, provider_id, _) = encounter(&svc).await;

    let _ = submit_five_star(&svc, enc.id, provider_id).await;

    // Rewind the acceptance past the review deadline.
    db.tweak_encounter(enc.id, |e| {
        e.accepted_at =
            (DateTime::now() - Duration::from_secs(15 * 24 * 60 * 60))
                .coerce();
    });

    let _ = tokio::time::timeout(Duration::from_secs(30 * 60), bg).await;

    let state = db.state();
    let closed = &state.encounters[&enc.id];
    assert_eq!(closed.status, encounter::Status::Closed);
    assert_eq!(
        closed.reviews_window.reason(),
        Some(CloseReason::DeadlinePassed),
    );
    // The one submitted review still publishes.
    assert_eq!(state.reviews.len(), 1);
    assert!(state.reviews[0].published_at.is_some());
}

#[tokio::test]
async fn review_is_rejected_when_window_closed_or_duplicate() {
    use submit_review::ExecutionError as E;

    let (svc, db, _sms, _bg) = support::service();
    let (enc, provider_id, client_id) = encounter(&svc).await;

    let _ = submit_five_star(&svc, enc.id, provider_id).await;
    let e = svc
        .execute(SubmitReview {
            encounter_id: enc.id,
            reviewer_id: provider_id,
            rating: review::Rating::new(4).unwrap(),
            comment: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::AlreadyReviewed(_)));

    // A stranger is not a party of the encounter.
    let e = svc
        .execute(SubmitReview {
            encounter_id: enc.id,
            reviewer_id: user::Id::new(),
            rating: review::Rating::new(4).unwrap(),
            comment: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::EncounterNotExists(_)));

    db.tweak_encounter(enc.id, |enc| {
        let _ = enc.reviews_window.close(
            CloseReason::DeadlinePassed,
            DateTime::now().coerce(),
        );
    });
    let e = svc
        .execute(SubmitReview {
            encounter_id: enc.id,
            reviewer_id: client_id,
            rating: review::Rating::new(4).unwrap(),
            comment: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::WindowClosed(_)));
}

#[tokio::test]
async fn session_linkage_requires_an_open_dateguard_window() {
    use start_session::ExecutionError as E;

    let (svc, db, _sms, _bg) = support::service();
    let (enc, provider_id, _) = encounter(&svc).await;
    support::monitored_user_with_id(&svc, provider_id, 1).await;

    // A stranger cannot link to someone else's encounter.
    let (stranger, _) = support::monitored_user(&svc, 2).await;
    let e = svc
        .execute(StartSession {
            user_id: stranger,
            duration: Duration::from_secs(60 * 60),
            group_ids: vec![],
            encounter_id: Some(enc.id),
            vai_details: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::EncounterNotExists(_)));

    db.tweak_encounter(enc.id, |enc| {
        let _ = enc.dateguard_window.close(
            CloseReason::DeadlinePassed,
            DateTime::now().coerce(),
        );
    });
    let e = svc
        .execute(StartSession {
            user_id: provider_id,
            duration: Duration::from_secs(60 * 60),
            group_ids: vec![],
            encounter_id: Some(enc.id),
            vai_details: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::EncounterWindowClosed(_)));
}

#[tokio::test]
async fn same_party_encounter_is_refused() {
    use service::command::record_encounter::ExecutionError as E;

    let (svc, _db, _sms, _bg) = support::service();

    let user_id = user::Id::new();
    let e = svc
        .execute(RecordEncounter {
            verification_id: encounter::VerificationId::default(),
            provider_id: user_id,
            client_id: user_id,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::SameParty(_)));
}
