use std::path::Path;

use warden_core::export::{render_snapshot_export, suggested_export_file_name};
use warden_core::util;

use crate::cli::ExportFormat;
use crate::commands::common::{open_refreshed_registry, RegistrySettings};
use crate::error::CliError;

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    settings: &RegistrySettings,
) -> Result<(), CliError> {
    let registry = open_refreshed_registry(settings).await?;
    let snapshot = registry.export().await;
    let now = util::now();
    let rendered = render_snapshot_export(&snapshot, format.into(), now)?;

    if let Some(path) = output_path {
        let path = if path.is_dir() {
            path.join(suggested_export_file_name(
                format.into(),
                now.timestamp_millis(),
            ))
        } else {
            path.to_path_buf()
        };
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
