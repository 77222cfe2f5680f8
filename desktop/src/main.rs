fn main() {
    if let Err(e) = dsa_desktop::run() {
        eprintln!("dsa-desktop: {e}");
        std::process::exit(1);
    }
}
