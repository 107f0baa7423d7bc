fn main() {
    hwc_core::cli::main();
}
