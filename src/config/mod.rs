//! Configuration loading

mod settings;

pub use settings::{
    BackfillSettings, CalendarSettings, IexSettings, Settings, StorageSettings,
};
