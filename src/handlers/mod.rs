pub mod session_handler;
