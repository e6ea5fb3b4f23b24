fn main() {
    niftydash::cli::run();
}
