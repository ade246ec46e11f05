//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity acceptance.
#[derive(Clone, Copy, Debug)]
pub struct Acceptance;

/// Marker type describing an entity check-in.
#[derive(Clone, Copy, Debug)]
pub struct CheckIn;

/// Marker type describing an entity closure.
#[derive(Clone, Copy, Debug)]
pub struct Closure;

/// Marker type describing an entity completion.
#[derive(Clone, Copy, Debug)]
pub struct Completion;

/// Marker type describing an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing an entity invitation.
#[derive(Clone, Copy, Debug)]
pub struct Invitation;

/// Marker type describing an entity publication.
#[derive(Clone, Copy, Debug)]
pub struct Publication;

/// Marker type describing an entity submission.
#[derive(Clone, Copy, Debug)]
pub struct Submission;
