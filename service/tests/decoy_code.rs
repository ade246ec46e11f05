//! Exit code evaluation: the decoy path must be outwardly indistinguishable
//! from the safe one.

mod support;

use std::time::Duration;

use service::{
    command::{submit_exit_code, SetSafetyCodes, SubmitExitCode},
    domain::{emergency, safety_code::ExitCode, session},
    Command as _,
};

#[tokio::test(start_paused = true)]
async fn decoy_exit_looks_like_a_safe_one() {
    let (svc, db, sms, bg) = support::service();

    let (safe_user, _) = support::monitored_user(&svc, 0).await;
    let safe_session = support::start_session(&svc, safe_user).await;
    let (duress_user, guardian) = support::monitored_user(&svc, 1).await;
    let duress_session = support::start_session(&svc, duress_user).await;

    let safe_ended = svc
        .execute(SubmitExitCode {
            user_id: safe_user,
            session_id: safe_session.id,
            code: ExitCode::new(support::SAFE_CODE).unwrap(),
        })
        .await
        .unwrap();
    let duress_ended = svc
        .execute(SubmitExitCode {
            user_id: duress_user,
            session_id: duress_session.id,
            code: ExitCode::new(support::DECOY_CODE).unwrap(),
        })
        .await
        .unwrap();

    // Both callers observe the very same shape of success.
    assert_eq!(safe_ended.session_id, safe_session.id);
    assert_eq!(duress_ended.session_id, duress_session.id);

    let _ = tokio::time::timeout(Duration::from_secs(60), bg).await;

    // Server-side the two paths diverge completely.
    let state = db.state();
    assert_eq!(
        state.sessions[&safe_session.id].status,
        session::Status::Completed,
    );
    assert_eq!(
        state.sessions[&duress_session.id].status,
        session::Status::Emergency,
    );
    assert_eq!(state.events.len(), 1);
    let event = state.events.values().next().unwrap();
    assert_eq!(event.trigger, emergency::Trigger::DecoyCode);
    assert_eq!(event.session_id, Some(duress_session.id));
    assert_eq!(event.notified, vec![guardian.id]);
    drop(state);
    assert_eq!(sms.attempts().len(), 1);
    assert_eq!(sms.attempts()[0].to, support::phone(1));
}

#[tokio::test(start_paused = true)]
async fn decoy_alerts_go_out_only_after_the_caller_is_answered() {
    let (svc, db, sms, bg) = support::service();
    let (user_id, guardian) = support::monitored_user(&svc, 4).await;
    let session = support::start_session(&svc, user_id).await;

    let _ = svc
        .execute(SubmitExitCode {
            user_id,
            session_id: session.id,
            code: ExitCode::new(support::DECOY_CODE).unwrap(),
        })
        .await
        .unwrap();

    // The answered caller saw no delivery happen: not a single dispatch was
    // even attempted yet, so the response timing betrays nothing.
    assert!(sms.attempts().is_empty());
    let state = db.state();
    assert_eq!(
        state.sessions[&session.id].status,
        session::Status::Emergency,
    );
    assert!(state.events.values().next().unwrap().notified.is_empty());
    drop(state);

    // The queued fan-out reaches the guardian in the background.
    let _ = tokio::time::timeout(Duration::from_secs(60), bg).await;

    assert_eq!(sms.attempts().len(), 1);
    assert_eq!(sms.attempts()[0].to, support::phone(4));
    assert_eq!(
        db.state().events.values().next().unwrap().notified,
        vec![guardian.id],
    );
}

#[tokio::test]
async fn unknown_code_is_rejected_and_session_stays_active() {
    use submit_exit_code::ExecutionError as E;

    let (svc, db, sms, _bg) = support::service();
    let (user_id, _) = support::monitored_user(&svc, 2).await;
    let session = support::start_session(&svc, user_id).await;

    let e = svc
        .execute(SubmitExitCode {
            user_id,
            session_id: session.id,
            code: ExitCode::new("cloudy day").unwrap(),
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::WrongCode));

    let state = db.state();
    assert_eq!(state.sessions[&session.id].status, session::Status::Active);
    assert!(state.events.is_empty());
    drop(state);
    assert!(sms.attempts().is_empty());
}

#[tokio::test]
async fn exit_code_of_an_ended_session_is_rejected() {
    use submit_exit_code::ExecutionError as E;

    let (svc, _db, _sms, _bg) = support::service();
    let (user_id, _) = support::monitored_user(&svc, 3).await;
    let session = support::start_session(&svc, user_id).await;

    let _ = svc
        .execute(SubmitExitCode {
            user_id,
            session_id: session.id,
            code: ExitCode::new(support::SAFE_CODE).unwrap(),
        })
        .await
        .unwrap();

    // The session left `Active` already, for either code.
    for code in [support::SAFE_CODE, support::DECOY_CODE] {
        let e = svc
            .execute(SubmitExitCode {
                user_id,
                session_id: session.id,
                code: ExitCode::new(code).unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(e.as_ref(), E::SessionNotActive(_)));
    }
}

#[tokio::test]
async fn identical_codes_are_refused_at_setup() {
    use service::command::set_safety_codes::ExecutionError as E;

    let (svc, _db, _sms, _bg) = support::service();

    let e = svc
        .execute(SetSafetyCodes {
            user_id: service::domain::user::Id::new(),
            safe: ExitCode::new("same code").unwrap(),
            decoy: ExitCode::new("same code").unwrap(),
        })
        .await
        .unwrap_err();
    assert!(matches!(e.as_ref(), E::CodesIdentical));
}
