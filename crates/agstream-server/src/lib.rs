//! HTTP server streaming scripted AG-UI runs over SSE and exposing the todo
//! tools.

pub mod config;
pub mod http;
pub mod service;
pub mod transport;

pub mod protocol {
    pub mod ag_ui {
        pub mod http;
    }
}
