pub mod session_loader;
