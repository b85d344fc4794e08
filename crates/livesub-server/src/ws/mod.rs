mod session;

pub use session::ws_session;
