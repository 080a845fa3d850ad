use anyhow::Result;
use geoelev::LookupFault;
use serde::Serialize;

use super::ServiceOptions;

#[derive(Serialize)]
struct ElevationResponse {
    lat: f64,
    lng: f64,
    elevation: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fault: Option<String>,
}

pub fn run(options: &ServiceOptions, lat: f64, lng: f64, json: bool) -> Result<()> {
    let mut service = options.build()?;

    let tile = service
        .covering_tiles(lat, lng)
        .first()
        .map(|t| t.file().display().to_string());

    let (elevation, fault) = match service.try_lookup(lat, lng) {
        Ok(elevation) => (elevation, None),
        Err(LookupFault::OutOfCoverage { .. }) => (geoelev::SEA_LEVEL, None),
        Err(fault) => (geoelev::SEA_LEVEL, Some(fault.to_string())),
    };

    if json {
        let response = ElevationResponse {
            lat,
            lng,
            elevation,
            tile,
            fault,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        if let Some(fault) = &fault {
            eprintln!("warning: {}", fault);
        }
        println!("{}", elevation);
    }

    Ok(())
}
