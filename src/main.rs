fn main() {
    if let Err(err) = alluvial_rs::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
