// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod crud;
pub mod dispatch;
pub mod entities;
pub mod forms;
pub mod ids;
pub mod locale;
pub mod model;
pub mod notify;
pub mod resource;
pub mod session;
pub mod state;
pub mod table;
pub mod ticket;

pub use crud::*;
pub use dispatch::*;
pub use entities::list_scope;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use notify::*;
pub use resource::*;
pub use session::*;
pub use state::*;
pub use table::*;
