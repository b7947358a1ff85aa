mod headless;
mod logging;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let parsed = match headless::parse_headless_args(&args) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{err}");
            headless::print_headless_help();
            std::process::exit(2);
        }
    };
    if parsed.help {
        headless::print_headless_help();
        return;
    }
    if parsed.list {
        headless::print_node_list();
        return;
    }

    logging::setup_tracing(parsed.log_level);
    tracing::info!("primgroup starting");
    if let Err(err) = headless::run_headless(&parsed) {
        eprintln!("primgroup error: {err}");
        std::process::exit(1);
    }
}
