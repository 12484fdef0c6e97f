fn main() {
    if let Err(err) = discovery_lib::run() {
        eprintln!("error while running discovery session: {err:#}");
        std::process::exit(1);
    }
}
