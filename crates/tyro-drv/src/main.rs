fn main() {
    std::process::exit(tyro_drv::run());
}
