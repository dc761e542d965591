//! Element models and MNA stamps for Voltaic.
//!
//! Each element kind is a struct bound to resolved matrix indices; the
//! [`Device`] enum is the dispatch table the solver drives through the
//! plugin contract: `stamp_static`, `stamp_dynamic`, `on_iter_accept`,
//! `on_step_change`.

pub mod controlled;
pub mod device;
pub mod diode;
pub mod passive;
pub mod reactive;
pub mod sources;
pub mod switch;

pub use controlled::{Cccs, Ccvs, Vccs, Vcvs};
pub use device::{Device, bind_all};
pub use diode::Diode;
pub use passive::Resistor;
pub use reactive::{Capacitor, Inductor};
pub use sources::{CurrentSource, VoltageSource};
pub use switch::Switch;
