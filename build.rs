fn main() {
    slint_build::compile("ui/app_window.slint").expect("failed to compile Slint UI");
}
