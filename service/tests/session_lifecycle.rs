//! Safety session lifecycle: check-ins, completion and watchdog escalation.

mod support;

use std::time::Duration;

use common::DateTime;
use service::{
    command::{start_session, CheckIn, StartSession, TriggerPanic},
    domain::{emergency, session},
    Command as _,
};

#[tokio::test]
async fn check_in_refreshes_and_safe_completion_is_quiet() {
    let (svc, db, sms, _bg) = support::service();
    let (user_id, _) = support::monitored_user(&svc, 0).await;
    let session = support::start_session(&svc, user_id).await;

    let checked = svc
        .execute(CheckIn {
            user_id,
            session_id: session.id,
        })
        .await
        .unwrap();
    assert!(checked.last_check_in.is_some());

    let ended = svc
        .execute(service::command::SubmitExitCode {
            user_id,
            session_id: session.id,
            code: service::domain::safety_code::ExitCode::new(
                support::SAFE_CODE,
            )
            .unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(ended.session_id, session.id);

    let state = db.state();
    assert_eq!(
        state.sessions[&session.id].status,
        session::Status::Completed,
    );
    assert!(state.events.is_empty());
    drop(state);
    assert!(sms.attempts().is_empty());
}

#[tokio::test]
async fn start_is_refused_without_codes_guardians_or_sane_duration() {
    use start_session::ExecutionError as E;

    let (svc, _db, _sms, _bg) = support::service();

    // No codes set up at all.
    let user_id = service::domain::user::Id::new();
    let e = svc
        .execute(StartSession {
            user_id,
            duration: Duration::from_secs(60 * 60),
            group_ids: vec![],
            encounter_id: None,
            vai_details: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::SafetyCodesNotSet));

    // Codes, but no guardian accepted an invitation yet.
    svc.execute(service::command::SetSafetyCodes {
        user_id,
        safe: service::domain::safety_code::ExitCode::new(support::SAFE_CODE)
            .unwrap(),
        decoy: service::domain::safety_code::ExitCode::new(
            support::DECOY_CODE,
        )
        .unwrap(),
    })
    .await
    .unwrap();
    let e = svc
        .execute(StartSession {
            user_id,
            duration: Duration::from_secs(60 * 60),
            group_ids: vec![],
            encounter_id: None,
            vai_details: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::NoActiveGuardians));

    // Unreasonable duration.
    let (user_id, _) = support::monitored_user(&svc, 1).await;
    for duration in [Duration::ZERO, Duration::from_secs(25 * 60 * 60)] {
        let e = svc
            .execute(StartSession {
                user_id,
                duration,
                group_ids: vec![],
                encounter_id: None,
                vai_details: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(e.as_ref(), E::InvalidDuration));
    }
}

#[tokio::test]
async fn check_in_cannot_revive_an_escalated_session() {
    use service::command::check_in::ExecutionError as E;

    let (svc, _db, _sms, _bg) = support::service();
    let (user_id, _) = support::monitored_user(&svc, 2).await;
    let session = support::start_session(&svc, user_id).await;

    let _ = svc
        .execute(TriggerPanic {
            user_id,
            session_id: Some(session.id),
            location: None,
        })
        .await
        .unwrap();

    let e = svc
        .execute(CheckIn {
            user_id,
            session_id: session.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::SessionNotActive(_)));
}

#[tokio::test(start_paused = true)]
async fn watchdog_escalates_unacknowledged_session_once() {
    let (svc, db, sms, bg) = support::service();
    let (user_id, guardian) = support::monitored_user(&svc, 3).await;
    let session = support::start_session(&svc, user_id).await;

    // Rewind the scheduled end past the grace period.
    db.tweak_session(session.id, |s| {
        s.ends_at = (DateTime::now() - Duration::from_secs(10 * 60)).coerce();
    });

    // Two watchdog sweeps fit into this window.
    let _ = tokio::time::timeout(Duration::from_secs(90 * 60), bg).await;

    let state = db.state();
    assert_eq!(
        state.sessions[&session.id].status,
        session::Status::Emergency,
    );
    // The second sweep must not raise a second emergency.
    assert_eq!(state.events.len(), 1);
    let event = state.events.values().next().unwrap();
    assert_eq!(event.trigger, emergency::Trigger::TimerExpired);
    assert_eq!(event.notified, vec![guardian.id]);
    drop(state);
    assert_eq!(sms.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn watchdog_completes_acknowledged_session_quietly() {
    let (svc, db, sms, bg) = support::service();
    let (user_id, _) = support::monitored_user(&svc, 4).await;
    let session = support::start_session(&svc, user_id).await;

    svc.execute(CheckIn {
        user_id,
        session_id: session.id,
    })
    .await
    .unwrap();

    // Overdue, but the check-in above falls within the grace window.
    db.tweak_session(session.id, |s| {
        s.ends_at = (DateTime::now() - Duration::from_secs(6 * 60)).coerce();
    });

    let _ = tokio::time::timeout(Duration::from_secs(30 * 60), bg).await;

    let state = db.state();
    assert_eq!(
        state.sessions[&session.id].status,
        session::Status::Completed,
    );
    assert!(state.events.is_empty());
    drop(state);
    assert!(sms.attempts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn watchdog_reports_missed_checkin_when_one_happened_before() {
    let (svc, db, _sms, bg) = support::service();
    let (user_id, _) = support::monitored_user(&svc, 5).await;
    let session = support::start_session(&svc, user_id).await;

    svc.execute(CheckIn {
        user_id,
        session_id: session.id,
    })
    .await
    .unwrap();

    // The check-in is too old to acknowledge the rewound expiry.
    db.tweak_session(session.id, |s| {
        s.ends_at = (DateTime::now() - Duration::from_secs(10 * 60)).coerce();
        s.last_check_in =
            Some((DateTime::now() - Duration::from_secs(60 * 60)).coerce());
    });

    let _ = tokio::time::timeout(Duration::from_secs(30 * 60), bg).await;

    let state = db.state();
    let event = state.events.values().next().unwrap();
    assert_eq!(event.trigger, emergency::Trigger::MissedCheckin);
}
