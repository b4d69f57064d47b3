/// Display version information
pub fn execute() {
    println!("gatehouse {}", env!("CARGO_PKG_VERSION"));
    println!("Whitelist gate for game and chat servers");
}
