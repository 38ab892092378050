#![forbid(unsafe_code)]

fn main() {
    std::process::exit(tophits_cli::run());
}
