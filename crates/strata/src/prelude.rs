pub use strata_types::error::{ClResult, Error};

pub use strata_layer::app::App;

pub use tracing::{debug, error, info, warn};

// vim: ts=4
