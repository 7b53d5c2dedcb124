use regauthctl::run;

fn main() {
    let result = run();
    let error = match result {
        Err(error) => error,
        Ok(0) => return,
        Ok(code) => std::process::exit(code),
    };

    // Default error handling prints the error in detailed format.
    eprintln!("regauthctl failed: {:?}", error);
    std::process::exit(1);
}
