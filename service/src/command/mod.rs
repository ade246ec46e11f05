//! [`Command`] definition.

pub mod accept_guardian_invite;
pub mod authorize_session;
pub mod check_in;
pub mod create_guardian_group;
pub mod invite_guardian;
pub mod lookup_nearest_authority;
pub mod record_encounter;
pub mod remove_guardian;
pub mod send_status_update;
pub mod set_safety_codes;
pub mod start_session;
pub mod submit_exit_code;
pub mod submit_review;
pub mod trigger_emergency;
pub mod trigger_panic;
pub mod update_location;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    accept_guardian_invite::AcceptGuardianInvite,
    authorize_session::AuthorizeSession, check_in::CheckIn,
    create_guardian_group::CreateGuardianGroup,
    invite_guardian::InviteGuardian,
    lookup_nearest_authority::LookupNearestAuthority,
    record_encounter::RecordEncounter, remove_guardian::RemoveGuardian,
    send_status_update::SendStatusUpdate, set_safety_codes::SetSafetyCodes,
    start_session::StartSession, submit_exit_code::SubmitExitCode,
    submit_review::SubmitReview, trigger_emergency::TriggerEmergency,
    trigger_panic::TriggerPanic, update_location::UpdateLocation,
};
