pub mod server;

pub use server::{run, run_gateway, run_on, serve};
