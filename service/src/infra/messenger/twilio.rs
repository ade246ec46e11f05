//! [Twilio] SMS [`Messenger`] implementation.
//!
//! [Twilio]: https://www.twilio.com

use common::operations::Dispatch;
use derive_more::Debug;
use secrecy::{ExposeSecret as _, SecretString};
use tracerr::Traced;

use crate::infra::messenger;

use super::{Alert, Messenger};

/// [`Twilio`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Account SID to authenticate with.
    pub account_sid: String,

    /// Auth token to authenticate with.
    #[debug(skip)]
    pub auth_token: SecretString,

    /// Phone number (or messaging service SID) to send from.
    pub from: String,
}

/// SMS [`Messenger`] delivering via the [Twilio] REST API.
///
/// [Twilio]: https://www.twilio.com
#[derive(Clone, Debug)]
pub struct Twilio {
    /// [`Config`] of this [`Twilio`] client.
    config: Config,

    /// HTTP client to perform requests with.
    http: reqwest::Client,
}

impl Twilio {
    /// Creates a new [`Twilio`] client with the provided [`Config`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl Messenger<Dispatch<Alert>> for Twilio {
    type Ok = ();
    type Err = Traced<messenger::Error>;

    async fn execute(
        &self,
        Dispatch(alert): Dispatch<Alert>,
    ) -> Result<Self::Ok, Self::Err> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid,
        );

        let resp = self
            .http
            .post(&url)
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[
                ("To", alert.to.as_ref()),
                ("From", self.config.from.as_str()),
                ("Body", alert.body.as_str()),
            ])
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> messenger::Error))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(tracerr::new!(messenger::Error::Rejected(format!(
                "{status}: {body}"
            ))));
        }

        Ok(())
    }
}
