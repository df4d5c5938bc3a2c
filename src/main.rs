//! # Voxel Streamer Entry Point
//!
//! Runs the headless streaming driver from the library.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json] [ticks]
//! ```

fn main() {
    voxel_streamer::run();
}
