//! Field resolution at query time.

pub(crate) mod output;
pub(crate) mod wiring;
