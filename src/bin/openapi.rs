use anyhow::Result;

// Print the OpenAPI document as pretty JSON.
fn main() -> Result<()> {
    let doc = tessera::api::openapi();
    let json = serde_json::to_string_pretty(&doc)?;
    println!("{json}");
    Ok(())
}
