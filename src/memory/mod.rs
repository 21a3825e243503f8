//! Holographic composition and storage.
//!
//! - **Binder**: circular convolution (bind) and correlation (unbind)
//! - **Recirculating Memory**: leaky self-loop accumulating bound pairs
//!   over simulated time, queried by unbinding a role

pub mod binder;
pub mod recirculating;
