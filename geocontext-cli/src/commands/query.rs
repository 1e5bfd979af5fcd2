//! Point lookup commands: service, group and collection.

use clap::Args;
use serde_json::Value;

use geocontext::context::{
    render_collection, render_entry, render_group, ContextError, OutputFormat,
};
use geocontext::coord::{parse_coordinate, QueryPoint};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Location and output options shared by the lookup commands.
#[derive(Debug, Args)]
pub struct PointArgs {
    /// X ordinate: longitude, easting or DMS such as 27:48:00:E
    #[arg(allow_hyphen_values = true)]
    pub x: String,

    /// Y ordinate: latitude, northing or DMS such as 32:06:00:S
    #[arg(allow_hyphen_values = true)]
    pub y: String,

    /// Spatial reference of the ordinates (EPSG code)
    #[arg(long, default_value = "4326")]
    pub srid: String,

    /// Search distance in meters (defaults to each service's tolerance)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Output encoding
    #[arg(long, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl PointArgs {
    /// Parse the query point.
    pub fn point(&self) -> Result<QueryPoint, ContextError> {
        parse_coordinate(&self.x, &self.y, &self.srid).map_err(ContextError::from)
    }
}

/// What a lookup resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Service,
    Group,
    Collection,
}

/// Run a lookup and print the rendered result to stdout.
pub async fn run(runner: &CliRunner, target: Target, key: &str, args: PointArgs) -> Result<(), CliError> {
    let point = args.point()?;
    let context = runner.context().await?;

    let rendered: Result<Value, ContextError> = match target {
        Target::Service => {
            let entry = context
                .retrieve_service_value(key, &point, args.tolerance)
                .await;
            entry.and_then(|entry| render_entry(context.registry(), &entry, args.format))
        }
        Target::Group => {
            let group = context
                .retrieve_group_values(key, &point, args.tolerance)
                .await;
            group.and_then(|group| render_group(context.registry(), &group, &point, args.format))
        }
        Target::Collection => {
            let collection = context
                .retrieve_collection_values(key, &point, args.tolerance)
                .await;
            collection.and_then(|collection| {
                render_collection(context.registry(), &collection, &point, args.format)
            })
        }
    };

    // Fetched values are worth keeping even when the lookup found nothing
    runner.persist(&context).await?;

    println!("{}", serde_json::to_string_pretty(&rendered?)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocontext::coord::Srid;

    fn args(x: &str, y: &str, srid: &str) -> PointArgs {
        PointArgs {
            x: x.to_string(),
            y: y.to_string(),
            srid: srid.to_string(),
            tolerance: None,
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn test_point_from_decimal_degrees() {
        let point = args("27.8", "-32.1", "4326").point().unwrap();
        assert_eq!(point.srid, Srid::WGS84);
        assert!((point.x - 27.8).abs() < 1e-9);
        assert!((point.y + 32.1).abs() < 1e-9);
    }

    #[test]
    fn test_point_rejects_bad_srid() {
        let err = args("27.8", "-32.1", "wgs").point().unwrap_err();
        assert!(err.is_client_error());
    }
}
