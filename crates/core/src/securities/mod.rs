//! Securities module - instrument identity and quote currency.

mod securities_model;
mod securities_traits;

pub use securities_model::{NewSecurity, Security, SecurityKind};
pub use securities_traits::SecurityRepositoryTrait;
