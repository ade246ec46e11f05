//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler of an operation.
///
/// The single seam every layer is built on: commands and queries of the
/// service, database operations, outbound message dispatches and scheduled
/// sweeps are all [`Handler`]s differing only in their `Args`.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
