use vergen::{vergen, Config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Exposes VERGEN_BUILD_DATE and VERGEN_BUILD_TIMESTAMP to the crate
    vergen(Config::default())?;

    Ok(())
}
