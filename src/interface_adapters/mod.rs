// Interface adapters: wire protocol, websocket fan-out, and internal HTTP routes.

pub mod http;
pub mod net;
pub mod protocol;
pub mod state;
