//! Guardian alert fan-out: durability ordering and partial failures.

mod support;

use service::{
    command::{
        AcceptGuardianInvite, InviteGuardian, SendStatusUpdate, TriggerPanic,
        UpdateLocation,
    },
    domain::{emergency::message, guardian, session::VaiDetails},
    Command as _,
};

/// Invites and activates one more guardian for the provided user.
async fn another_guardian(
    svc: &support::TestService,
    user_id: service::domain::user::Id,
    phone_digit: u8,
) -> guardian::Guardian {
    let guardian = svc
        .execute(InviteGuardian {
            user_id,
            name: guardian::Name::new("Robin").unwrap(),
            phone: support::phone(phone_digit),
            group_ids: vec![],
        })
        .await
        .unwrap();
    svc.execute(AcceptGuardianInvite {
        guardian_id: guardian.id,
    })
    .await
    .unwrap();
    guardian
}

#[tokio::test]
async fn partial_delivery_failure_never_fails_the_emergency() {
    let (svc, db, sms, _bg) = support::service();
    let (user_id, good) = support::monitored_user(&svc, 0).await;
    let bad = another_guardian(&svc, user_id, 1).await;
    let session = support::start_session(&svc, user_id).await;

    sms.fail(&bad.phone);

    let event = svc
        .execute(TriggerPanic {
            user_id,
            session_id: Some(session.id),
            location: None,
        })
        .await
        .unwrap();

    // Both deliveries were attempted, only the successful one is recorded.
    assert_eq!(sms.attempts().len(), 2);
    assert_eq!(event.notified, vec![good.id]);
    assert_eq!(db.state().events[&event.id].notified, vec![good.id]);
}

#[tokio::test]
async fn emergency_survives_total_delivery_failure() {
    let (svc, db, sms, _bg) = support::service();
    let (user_id, guardian) = support::monitored_user(&svc, 2).await;
    let session = support::start_session(&svc, user_id).await;

    sms.fail(&guardian.phone);

    let event = svc
        .execute(TriggerPanic {
            user_id,
            session_id: Some(session.id),
            location: None,
        })
        .await
        .unwrap();

    // The event was persisted before the fan-out, so it survives it failing
    // entirely.
    assert!(event.notified.is_empty());
    assert!(db.state().events[&event.id].notified.is_empty());
}

#[tokio::test]
async fn alert_carries_location_and_meeting_details() {
    let (svc, _db, sms, _bg) = support::service();
    let (user_id, _) = support::monitored_user(&svc, 3).await;
    let session = svc
        .execute(service::command::StartSession {
            user_id,
            duration: std::time::Duration::from_secs(60 * 60),
            group_ids: vec![],
            encounter_id: None,
            vai_details: Some(VaiDetails::new("Alex R., verified").unwrap()),
        })
        .await
        .unwrap();

    let point = support::geo_point();
    svc.execute(UpdateLocation {
        user_id,
        session_id: session.id,
        location: point,
    })
    .await
    .unwrap();

    let _ = svc
        .execute(TriggerPanic {
            user_id,
            session_id: Some(session.id),
            location: None,
        })
        .await
        .unwrap();

    let bodies = sms.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("panic button"));
    assert!(bodies[0].contains(&point.map_link()));
    assert!(bodies[0].contains("Alex R., verified"));
}

#[tokio::test]
async fn gps_broadcast_reaches_only_already_notified_guardians() {
    let (svc, db, sms, _bg) = support::service();
    let (user_id, good) = support::monitored_user(&svc, 4).await;
    let bad = another_guardian(&svc, user_id, 5).await;
    let session = support::start_session(&svc, user_id).await;

    sms.fail(&bad.phone);

    let _ = svc
        .execute(TriggerPanic {
            user_id,
            session_id: Some(session.id),
            location: None,
        })
        .await
        .unwrap();
    assert_eq!(sms.attempts().len(), 2);

    svc.execute(UpdateLocation {
        user_id,
        session_id: session.id,
        location: support::geo_point(),
    })
    .await
    .unwrap();

    // Only the guardian alerted initially receives the GPS broadcast.
    let attempts = sms.attempts();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[2].to, good.phone);
    assert!(attempts[2].body.contains("Location update"));

    // The broadcast is persisted regardless of delivery.
    assert_eq!(db.state().messages.len(), 1);
}

#[tokio::test]
async fn status_update_is_persisted_before_delivery() {
    let (svc, db, sms, _bg) = support::service();
    let (user_id, guardian) = support::monitored_user(&svc, 6).await;
    let session = support::start_session(&svc, user_id).await;

    let event = svc
        .execute(TriggerPanic {
            user_id,
            session_id: Some(session.id),
            location: None,
        })
        .await
        .unwrap();

    // Delivery starts failing after the initial fan-out.
    sms.fail(&guardian.phone);

    let message = svc
        .execute(SendStatusUpdate {
            user_id,
            event_id: event.id,
            body: message::Body::new("moved to the cafe next door").unwrap(),
        })
        .await
        .unwrap();

    let state = db.state();
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].id, message.id);
    drop(state);
    // The failed delivery was still attempted.
    assert_eq!(sms.attempts().len(), 2);
}
