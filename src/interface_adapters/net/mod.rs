// Network adapter modules split by client sockets vs internal HTTP routes.

pub mod client;
pub mod internal;

pub use client::ws_handler;
pub use internal::{
    create_vessel_handler, delete_vessel_handler, get_instruments_handler, get_vessel_handler,
    list_vessels_handler, update_heading_handler, update_position_handler,
};
