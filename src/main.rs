fn main() {
    if let Err(err) = inbox_capture_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
