//! The collector thread and the channel mutators use to reach it.

mod controller;
pub use controller::GCController;

mod gc_requester;
pub use gc_requester::{CollectorRequest, GCRequester};
