use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    fluentcoach::logging::init();
    fluentcoach::cli::main()
}
