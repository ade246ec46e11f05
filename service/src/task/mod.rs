//! Background [`Task`]s definitions.

mod background;
pub mod close_encounter_windows;
pub mod deliver_alerts;
pub mod watchdog;

pub use common::Handler as Task;

pub use self::{
    background::Background, close_encounter_windows::CloseEncounterWindows,
    deliver_alerts::DeliverAlerts, watchdog::Watchdog,
};
