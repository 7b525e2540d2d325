fn main() {
    if let Err(err) = trial_merge::run() {
        eprintln!("error: {err:#}");
        std::process::exit(trial_merge::error::exit_code_for(&err));
    }
}
