//! SMS [`Messenger`]-related implementations.

pub mod twilio;
pub mod unconfigured;

use common::operations::Dispatch;
use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;

use crate::domain::guardian;

pub use self::{twilio::Twilio, unconfigured::Unconfigured};

/// Messenger operation.
pub use common::Handler as Messenger;

/// SMS alert to be delivered to a single guardian.
#[derive(Clone, Debug)]
pub struct Alert {
    /// [`guardian::Phone`] number to deliver the [`Alert`] to.
    pub to: guardian::Phone,

    /// Text of the [`Alert`].
    pub body: String,
}

/// [`Messenger`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP transport failure.
    #[display("HTTP request failed: {_0}")]
    Http(reqwest::Error),

    /// SMS provider rejected the message.
    #[display("SMS provider rejected the message: {_0}")]
    #[from(ignore)]
    Rejected(#[error(not(source))] String),
}

/// [`Messenger`] implementation selected at startup.
#[derive(Clone, Debug, From)]
pub enum Provider {
    /// [Twilio] SMS delivery.
    ///
    /// [Twilio]: https://www.twilio.com
    Twilio(Twilio),

    /// No delivery configured.
    Unconfigured(Unconfigured),
}

impl Messenger<Dispatch<Alert>> for Provider {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        dispatch: Dispatch<Alert>,
    ) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Twilio(m) => m.execute(dispatch).await,
            Self::Unconfigured(m) => m.execute(dispatch).await,
        }
        .map_err(tracerr::wrap!())
    }
}
