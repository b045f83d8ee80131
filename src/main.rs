fn main() {
    if let Err(err) = strata::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
