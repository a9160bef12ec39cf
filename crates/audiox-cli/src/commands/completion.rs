use anyhow::Result;

pub fn run() -> Result<()> {
    println!("Shell completion not implemented yet");
    Ok(())
}
