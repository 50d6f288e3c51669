//! Binary entrypoint for the art sparker HTTP server.

use std::process::ExitCode;

use art_sparker::start_art_sparker;

fn main() -> ExitCode {
    start_art_sparker::run()
}
