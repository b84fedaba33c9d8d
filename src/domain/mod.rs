pub mod keba_payload;
pub mod models;
pub mod session_energy;
pub mod session_state;
