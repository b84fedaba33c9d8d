pub mod api;
pub mod db;
pub mod keba_debug_file;
pub mod keba_modbus;
pub mod keba_udp;
