// The core module contains the economy domain.
// Each feature gets its own submodule.

#[path = "economy/mod.rs"]
pub mod economy;
