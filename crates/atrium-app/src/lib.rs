// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod dialog;
pub mod forms;
pub mod ids;
pub mod list;
pub mod model;
pub mod notify;
pub mod query;
pub mod repository;
pub mod state;
pub mod table;

pub use dialog::*;
pub use forms::*;
pub use ids::*;
pub use list::*;
pub use model::*;
pub use notify::*;
pub use query::*;
pub use repository::*;
pub use state::*;
pub use table::*;
