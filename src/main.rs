#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    chess_desktop_lib::run()
}
