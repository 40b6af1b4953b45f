pub fn run() -> anyhow::Result<()> {
    println!("mnemo {}", env!("CARGO_PKG_VERSION"));
    println!("Rolling observation memory with budgeted reflection");
    Ok(())
}
