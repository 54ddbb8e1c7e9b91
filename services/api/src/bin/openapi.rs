//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the maps API to `openapi.json` (or to the
//! path given as the first argument) so frontend clients can be generated
//! without starting the server.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    std::fs::write(&path, ApiDoc::openapi().to_pretty_json()?)?;
    println!("OpenAPI document written to {}", path);
    Ok(())
}
