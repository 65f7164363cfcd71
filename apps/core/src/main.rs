use clap::Parser;

fn main() {
    let cli = match linkroute_core::runtime::Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };

    if let Err(error) = linkroute_core::runtime::run(cli) {
        eprintln!("[linkroute] {error}");
        std::process::exit(1);
    }
}
