fn main() {
    std::process::exit(skillctl::run_cli());
}
